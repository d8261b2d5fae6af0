//! The control panel: folders of sliders, toggles and a colour picker bound to showroom
//! parameters.

use std::f32::consts::{FRAC_PI_2, TAU};

use crate::{
    data_structures::scene_graph::Color,
    gui::labels::{Label, Locale},
    scene::composer::{Param, Showroom, Value},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Widget {
    Slider { min: f32, max: f32, step: Option<f32> },
    Toggle,
    ColorPicker,
}

impl Widget {
    fn slider(min: f32, max: f32) -> Self {
        Widget::Slider {
            min,
            max,
            step: None,
        }
    }

    /// Bring `value` into this widget's domain: numbers are snapped to the step and clamped
    /// to the range. Anything else passes through.
    pub fn constrain(&self, value: Value) -> Value {
        match (self, value) {
            (Widget::Slider { min, max, step }, Value::Number(n)) => {
                let n = if n.is_nan() { *min } else { n };
                let snapped = match step {
                    Some(step) if *step > 0.0 => min + ((n - min) / step).round() * step,
                    _ => n,
                };
                Value::Number(snapped.clamp(*min, *max))
            }
            (_, value) => value,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Control {
    pub param: Param,
    pub label: Label,
    pub widget: Widget,
}

impl Control {
    fn new(param: Param, label: Label, widget: Widget) -> Self {
        Self {
            param,
            label,
            widget,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Folder {
    pub label: Label,
    pub controls: Vec<Control>,
    pub folders: Vec<Folder>,
    /// Hidden until a model is attached.
    pub requires_model: bool,
}

impl Folder {
    fn new(label: Label, controls: Vec<Control>) -> Self {
        Self {
            label,
            controls,
            folders: Vec::new(),
            requires_model: false,
        }
    }

    fn controls_recursive(&self) -> Box<dyn Iterator<Item = &Control> + '_> {
        Box::new(
            self.controls
                .iter()
                .chain(self.folders.iter().flat_map(|f| f.controls_recursive())),
        )
    }
}

#[derive(Clone, Debug)]
pub struct ControlPanel {
    folders: Vec<Folder>,
    open: bool,
    locale: Locale,
}

impl ControlPanel {
    pub fn new(locale: Locale) -> Self {
        let mut car = Folder::new(
            Label::CarFolder,
            vec![
                Control::new(Param::ModelRotationY, Label::RotationY, Widget::slider(0.0, TAU)),
                Control::new(Param::ModelHeight, Label::Height, Widget::slider(0.0, 5.0)),
                Control::new(Param::ModelScaleX, Label::ScaleX, Widget::slider(0.1, 2.0)),
                Control::new(Param::ModelScaleY, Label::ScaleY, Widget::slider(0.1, 2.0)),
                Control::new(Param::ModelScaleZ, Label::ScaleZ, Widget::slider(0.1, 2.0)),
            ],
        );
        car.requires_model = true;
        car.folders.push(Folder::new(
            Label::ColorFolder,
            vec![Control::new(
                Param::BodyColor,
                Label::BodyColor,
                Widget::ColorPicker,
            )],
        ));

        let spot = Folder::new(
            Label::SpotFolder,
            vec![
                Control::new(Param::SpotIntensity, Label::SpotIntensity, Widget::slider(0.0, 2.0)),
                Control::new(Param::SpotAngle, Label::SpotAngle, Widget::slider(0.0, FRAC_PI_2)),
                Control::new(Param::SpotPenumbra, Label::SpotPenumbra, Widget::slider(0.0, 1.0)),
                Control::new(Param::SpotHeight, Label::SpotHeight, Widget::slider(0.0, 10.0)),
            ],
        );
        let rotation = Folder::new(
            Label::RotationFolder,
            vec![
                Control::new(Param::AutoRotateEnabled, Label::RotationEnabled, Widget::Toggle),
                Control::new(Param::AutoRotateSpeed, Label::RotationSpeed, Widget::slider(0.0, 0.05)),
            ],
        );
        let bias = Widget::Slider {
            min: -0.01,
            max: 0.01,
            step: Some(0.001),
        };
        let shadows = Folder::new(
            Label::ShadowFolder,
            vec![
                Control::new(Param::DirectionalShadowBias, Label::DirectionalShadowBias, bias),
                Control::new(Param::SpotShadowBias, Label::SpotShadowBias, bias),
                Control::new(Param::GroundHeight, Label::GroundHeight, Widget::slider(-5.0, 0.0)),
            ],
        );

        Self {
            folders: vec![car, spot, rotation, shadows],
            open: true,
            locale,
        }
    }

    pub fn folders(&self) -> &[Folder] {
        &self.folders
    }

    pub fn control(&self, param: Param) -> Option<&Control> {
        self.folders
            .iter()
            .flat_map(|f| f.controls_recursive())
            .find(|c| c.param == param)
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn toggle(&mut self) {
        self.open = !self.open;
    }

    /// Label of the button that opens or closes the panel.
    pub fn toggle_label(&self) -> &'static str {
        self.locale.text(if self.open {
            Label::ClosePanel
        } else {
            Label::OpenPanel
        })
    }

    /// Constrain `value` to the control bound to `param` and write it to `showroom`.
    pub fn apply(&self, showroom: &mut Showroom, param: Param, value: Value) -> bool {
        let value = match self.control(param) {
            Some(control) => control.widget.constrain(value),
            None => value,
        };
        showroom.set(param, value)
    }

    /// Draw the panel in the top right corner.
    pub fn show(&mut self, ctx: &egui::Context, showroom: &mut Showroom) {
        let mut toggled = false;
        egui::Window::new("controls")
            .title_bar(false)
            .resizable(false)
            .anchor(egui::Align2::RIGHT_TOP, egui::vec2(-8.0, 8.0))
            .default_width(260.0)
            .show(ctx, |ui| {
                if self.open {
                    for folder in &self.folders {
                        self.show_folder(ui, folder, showroom);
                    }
                }
                toggled = ui
                    .add_sized([ui.available_width(), 20.0], egui::Button::new(self.toggle_label()))
                    .clicked();
            });
        if toggled {
            self.toggle();
        }
    }

    fn show_folder(&self, ui: &mut egui::Ui, folder: &Folder, showroom: &mut Showroom) {
        if folder.requires_model && showroom.model().is_none() {
            return;
        }
        egui::CollapsingHeader::new(self.locale.text(folder.label))
            .default_open(true)
            .show(ui, |ui| {
                for control in &folder.controls {
                    self.show_control(ui, control, showroom);
                }
                for sub in &folder.folders {
                    self.show_folder(ui, sub, showroom);
                }
            });
    }

    fn show_control(&self, ui: &mut egui::Ui, control: &Control, showroom: &mut Showroom) {
        let Some(current) = showroom.get(control.param) else {
            return;
        };
        let label = self.locale.text(control.label);
        let changed = match (control.widget, current) {
            (Widget::Slider { min, max, step }, Value::Number(mut n)) => {
                let mut slider = egui::Slider::new(&mut n, min..=max).text(label);
                if let Some(step) = step {
                    slider = slider.step_by(step as f64);
                }
                ui.add(slider).changed().then_some(Value::Number(n))
            }
            (Widget::Toggle, Value::Flag(mut enabled)) => ui
                .checkbox(&mut enabled, label)
                .changed()
                .then_some(Value::Flag(enabled)),
            (Widget::ColorPicker, Value::Color(color)) => {
                let mut rgb = color.to_srgb_u8();
                ui.horizontal(|ui| {
                    let changed = ui.color_edit_button_srgb(&mut rgb).changed();
                    ui.label(label);
                    changed
                })
                .inner
                .then(|| Value::Color(Color::from_srgb_u8(rgb)))
            }
            (widget, value) => {
                log::warn!("{:?} cannot show {:?} for {:?}", widget, value, control.param);
                None
            }
        };
        if let Some(value) = changed {
            self.apply(showroom, control.param, value);
        }
    }
}
