//! Window-level feedback: the loading strip along the top edge and the
//! dismissable error line under it.

use egui::{Color32, RichText, Sense, Ui};
use std::time::{Duration, Instant};

use super::theme;

const RISE: Duration = Duration::from_millis(250);
const CRAWL: Duration = Duration::from_millis(7500);
const COMPLETE: Duration = Duration::from_millis(150);
const FADE: Duration = Duration::from_millis(300);
const SHRINK: Duration = Duration::from_millis(200);

/// Fill reached at the end of the rise and the crawl
const RISE_FILL: f32 = 0.17;
const CRAWL_FILL: f32 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    Idle,
    Rising,
    Crawling,
    Completing,
    Fading,
    Shrinking,
}

/// Indeterminate progress: rises quickly, crawls while the request runs,
/// then either completes and fades or collapses back on failure.
pub struct ProgressBar {
    stage: Stage,
    fill: f32,
    since: Instant,
}

impl Default for ProgressBar {
    fn default() -> Self {
        Self {
            stage: Stage::Idle,
            fill: 0.0,
            since: Instant::now(),
        }
    }
}

fn ratio(elapsed: Duration, total: Duration) -> f32 {
    (elapsed.as_secs_f32() / total.as_secs_f32()).min(1.0)
}

impl ProgressBar {
    pub fn start(&mut self) {
        self.fill = 0.0;
        self.enter(Stage::Rising);
    }

    pub fn finish(&mut self, failed: bool) {
        self.enter(if failed { Stage::Shrinking } else { Stage::Completing });
    }

    pub fn is_active(&self) -> bool {
        self.stage != Stage::Idle
    }

    fn enter(&mut self, stage: Stage) {
        self.stage = stage;
        self.since = Instant::now();
    }

    /// Advance the animation. Returns whether another frame is needed.
    pub fn tick(&mut self) -> bool {
        let elapsed = self.since.elapsed();
        let next = match self.stage {
            Stage::Idle => return false,
            Stage::Rising => {
                self.fill = RISE_FILL * ratio(elapsed, RISE);
                (elapsed >= RISE).then_some(Stage::Crawling)
            }
            Stage::Crawling => {
                self.fill = RISE_FILL + (CRAWL_FILL - RISE_FILL) * ratio(elapsed, CRAWL);
                None
            }
            Stage::Completing => {
                self.fill += (1.0 - self.fill) * ratio(elapsed, COMPLETE);
                (elapsed >= COMPLETE).then_some(Stage::Fading)
            }
            Stage::Fading => (elapsed >= FADE).then_some(Stage::Idle),
            Stage::Shrinking => {
                self.fill *= 1.0 - ratio(elapsed, SHRINK);
                (elapsed >= SHRINK).then_some(Stage::Idle)
            }
        };
        match next {
            Some(Stage::Idle) => {
                self.fill = 0.0;
                self.enter(Stage::Idle);
            }
            Some(Stage::Fading) => {
                self.fill = 1.0;
                self.enter(Stage::Fading);
            }
            Some(stage) => self.enter(stage),
            None => {}
        }
        true
    }

    fn opacity(&self) -> f32 {
        match self.stage {
            Stage::Fading => 1.0 - ratio(self.since.elapsed(), FADE),
            _ => 1.0,
        }
    }

    /// Paint into a strip of fixed height so the layout never shifts
    pub fn show(&self, ui: &mut Ui, height: f32) {
        let (strip, _) = ui.allocate_exact_size(egui::vec2(ui.available_width(), height), Sense::hover());
        if !self.is_active() || self.fill <= 0.0 || !ui.is_rect_visible(strip) {
            return;
        }
        let mut filled = strip;
        filled.set_width(strip.width() * self.fill);
        let color = Color32::WHITE.gamma_multiply(self.opacity());
        ui.painter().rect_filled(filled, 0.0, color);
    }
}

/// Last error worth showing, with copy and dismiss actions
#[derive(Default)]
pub struct StatusLine {
    error: Option<String>,
}

impl StatusLine {
    pub fn set(&mut self, message: impl Into<String>) {
        self.error = Some(message.into());
    }

    pub fn clear(&mut self) {
        self.error = None;
    }

    pub fn show(&mut self, ui: &mut Ui) {
        let Some(message) = self.error.as_deref() else {
            return;
        };
        let (_, dim) = theme::text_colors();
        let mut dismissed = false;
        ui.horizontal(|ui| {
            ui.label(RichText::new(egui_phosphor::regular::WARNING_CIRCLE).color(theme::DELAYED));
            ui.label(RichText::new(message).color(theme::DELAYED));
            ui.add_space(8.0);
            let copy = ui
                .add(egui::Button::new(RichText::new(egui_phosphor::regular::COPY).color(dim)).frame(false))
                .on_hover_cursor(egui::CursorIcon::PointingHand)
                .on_hover_text("Copy");
            if copy.clicked() {
                ui.ctx().copy_text(message.to_string());
            }
            let close = ui
                .add(egui::Button::new(RichText::new(egui_phosphor::regular::X).color(dim)).frame(false))
                .on_hover_cursor(egui::CursorIcon::PointingHand);
            dismissed = close.clicked();
        });
        ui.add_space(8.0);
        if dismissed {
            self.error = None;
        }
    }
}
