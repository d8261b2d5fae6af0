//! Localized strings for the control panel and the loading overlay.

use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    English,
    Chinese,
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "en" | "en-us" | "en_us" | "english" => Ok(Locale::English),
            "zh" | "zh-cn" | "zh_cn" | "chinese" => Ok(Locale::Chinese),
            other => Err(format!("unknown locale {other:?}, expected \"en\" or \"zh\"")),
        }
    }
}

impl Locale {
    /// Whether the default egui fonts lack glyphs for this locale.
    pub fn needs_cjk_font(self) -> bool {
        matches!(self, Locale::Chinese)
    }

    pub fn text(self, label: Label) -> &'static str {
        match self {
            Locale::English => english(label),
            Locale::Chinese => chinese(label),
        }
    }
}

/// Every user-facing string.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Label {
    OpenPanel,
    ClosePanel,
    CarFolder,
    RotationY,
    Height,
    ScaleX,
    ScaleY,
    ScaleZ,
    ColorFolder,
    BodyColor,
    SpotFolder,
    SpotIntensity,
    SpotAngle,
    SpotPenumbra,
    SpotHeight,
    RotationFolder,
    RotationEnabled,
    RotationSpeed,
    ShadowFolder,
    DirectionalShadowBias,
    SpotShadowBias,
    GroundHeight,
    Loading,
    LoadFailed,
    CheckConsole,
}

fn english(label: Label) -> &'static str {
    match label {
        Label::OpenPanel => "Open controls",
        Label::ClosePanel => "Close controls",
        Label::CarFolder => "Car",
        Label::RotationY => "Rotation",
        Label::Height => "Height",
        Label::ScaleX => "Scale X",
        Label::ScaleY => "Scale Y",
        Label::ScaleZ => "Scale Z",
        Label::ColorFolder => "Colour",
        Label::BodyColor => "Body colour",
        Label::SpotFolder => "Spotlight",
        Label::SpotIntensity => "Intensity",
        Label::SpotAngle => "Angle",
        Label::SpotPenumbra => "Edge softness",
        Label::SpotHeight => "Light height",
        Label::RotationFolder => "Auto rotation",
        Label::RotationEnabled => "Rotate",
        Label::RotationSpeed => "Speed",
        Label::ShadowFolder => "Shadows",
        Label::DirectionalShadowBias => "Sun shadow bias",
        Label::SpotShadowBias => "Spot shadow bias",
        Label::GroundHeight => "Ground height",
        Label::Loading => "Loading...",
        Label::LoadFailed => "Failed to load the model!",
        Label::CheckConsole => "Check the console for details",
    }
}

fn chinese(label: Label) -> &'static str {
    match label {
        Label::OpenPanel => "打开控制器",
        Label::ClosePanel => "关闭控制器",
        Label::CarFolder => "汽车控制",
        Label::RotationY => "旋转",
        Label::Height => "高度",
        Label::ScaleX => "缩放 X",
        Label::ScaleY => "缩放 Y",
        Label::ScaleZ => "缩放 Z",
        Label::ColorFolder => "颜色控制",
        Label::BodyColor => "车身外观颜色",
        Label::SpotFolder => "聚光灯控制",
        Label::SpotIntensity => "光照强度",
        Label::SpotAngle => "光照角度",
        Label::SpotPenumbra => "边缘柔和度",
        Label::SpotHeight => "灯光高度",
        Label::RotationFolder => "旋转控制",
        Label::RotationEnabled => "开启旋转",
        Label::RotationSpeed => "旋转速度",
        Label::ShadowFolder => "阴影控制",
        Label::DirectionalShadowBias => "平行光阴影",
        Label::SpotShadowBias => "聚光灯阴影",
        Label::GroundHeight => "地面位置",
        Label::Loading => "加载中...",
        Label::LoadFailed => "加载出错!",
        Label::CheckConsole => "请检查控制台获取详细信息",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_locale_names() {
        assert_eq!("zh".parse::<Locale>(), Ok(Locale::Chinese));
        assert_eq!(" EN ".parse::<Locale>(), Ok(Locale::English));
        assert!("fr".parse::<Locale>().is_err());
    }

    #[test]
    fn panel_toggle_is_localized() {
        assert_eq!(Locale::Chinese.text(Label::OpenPanel), "打开控制器");
        assert_eq!(Locale::English.text(Label::ClosePanel), "Close controls");
        assert!(Locale::Chinese.needs_cjk_font());
        assert!(!Locale::English.needs_cjk_font());
    }
}
