//! Centered loading box: progress while the model streams in, the error once it failed.

use crate::{
    gui::labels::{Label, Locale},
    scene::composer::LoadStatus,
};

/// Draw the overlay for `status`. Nothing is drawn once the model is ready.
pub fn show(ctx: &egui::Context, status: &LoadStatus, locale: Locale) {
    if *status == LoadStatus::Ready {
        return;
    }
    egui::Area::new(egui::Id::new("loading overlay"))
        .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
        .interactable(false)
        .show(ctx, |ui| {
            egui::Frame::new()
                .fill(egui::Color32::from_black_alpha(204))
                .corner_radius(10.0)
                .inner_margin(20.0)
                .show(ui, |ui| {
                    ui.set_width(240.0);
                    ui.vertical_centered(|ui| match status {
                        LoadStatus::Loading { .. } => {
                            ui.label(
                                egui::RichText::new(locale.text(Label::Loading))
                                    .size(24.0)
                                    .color(egui::Color32::WHITE),
                            );
                            let fraction = status.fraction().unwrap_or(0.0);
                            ui.add(
                                egui::ProgressBar::new(fraction)
                                    .desired_height(10.0)
                                    .show_percentage(),
                            );
                        }
                        LoadStatus::Failed(message) => {
                            ui.label(
                                egui::RichText::new(locale.text(Label::LoadFailed))
                                    .size(24.0)
                                    .color(egui::Color32::from_rgb(255, 80, 80)),
                            );
                            ui.label(egui::RichText::new(message).color(egui::Color32::LIGHT_GRAY));
                            ui.label(
                                egui::RichText::new(locale.text(Label::CheckConsole))
                                    .color(egui::Color32::WHITE),
                            );
                        }
                        LoadStatus::Ready => {}
                    });
                });
        });
}
