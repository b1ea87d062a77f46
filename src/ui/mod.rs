//! egui overlay drawn over the scene: the hover tooltip and the interaction hint.

use crate::config::OverlayConfig;
use glam::Vec2;

pub struct Overlay {
    hint: Option<String>,
}

impl Overlay {
    pub fn new(config: &OverlayConfig) -> Self {
        let hint = (config.show_hint && !config.hint.trim().is_empty()).then(|| config.hint.clone());
        Self { hint }
    }

    /// `tooltip` is the anchor (pointer plus offset, logical px) and the text to show.
    pub fn show(&self, ctx: &egui::Context, tooltip: Option<(Vec2, &str)>) {
        if let Some((anchor, text)) = tooltip {
            egui::Area::new(egui::Id::new("section_tooltip"))
                .order(egui::Order::Tooltip)
                .fixed_pos(egui::pos2(anchor.x, anchor.y))
                .interactable(false)
                .show(ctx, |ui| {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.label(egui::RichText::new(text).strong());
                    });
                });
        }

        if let Some(hint) = &self.hint {
            egui::Area::new(egui::Id::new("interaction_hint"))
                .order(egui::Order::Foreground)
                .anchor(egui::Align2::CENTER_BOTTOM, egui::vec2(0.0, -16.0))
                .interactable(false)
                .show(ctx, |ui| {
                    ui.label(egui::RichText::new(hint.as_str()).small().weak());
                });
        }
    }
}
