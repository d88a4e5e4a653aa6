use chrono::{Local, NaiveDate};
use eframe::egui;
use egui::{Color32, RichText};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};

use crate::api::{Backend, CommandOutcome, Company, DemoStore, Lot, LotId, StoreCommand};
use crate::config::{Config, SecondPressPolicy, MAX_DAY_WIDTH, MIN_DAY_WIDTH};
use crate::timeline::{ScheduleView, TimelineSettings};
use super::status::{ProgressBar, StatusLine};
use super::views::{self, QuickAddForm};

pub struct LotlineApp {
    config: Config,
    state: AppState,

    // Timeline state and the in-memory store used in demo mode
    view: ScheduleView,
    demo_store: Arc<Mutex<DemoStore>>,
    quick_add_form: QuickAddForm,
    scroll_to: Option<f32>,

    // Delete confirmation (lot id, lot name)
    pending_delete: Option<(LotId, String)>,

    // Settings dialog
    show_settings: bool,
    settings_url: String,
    settings_key: String,
    settings_project: String,
    settings_demo: bool,
    settings_font_scale: f32,
    settings_day_width: f32,
    settings_quick_add_days: i64,
    settings_second_press: SecondPressPolicy,

    // Status
    status: StatusLine,
    loading: bool,
    in_flight: usize,
    is_offline: bool,

    progress: ProgressBar,

    // Async communication
    runtime: tokio::runtime::Runtime,
    result_rx: Receiver<AsyncResult>,
    result_tx: Sender<AsyncResult>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum AppState {
    Setup,
    Main,
}

enum AsyncResult {
    Loaded(Vec<Lot>, Vec<Company>),
    Committed(CommandOutcome),
    CommandFailed {
        command: StoreCommand,
        message: String,
        offline: bool,
    },
    Error(String),
    Offline,
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

impl LotlineApp {
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let config = Config::load().unwrap_or_else(|e| {
            log::warn!("Using default config: {:#}", e);
            Config::default()
        });
        super::setup_fonts(&cc.egui_ctx);
        super::setup_theme(&cc.egui_ctx);
        let state = if config.is_configured() {
            AppState::Main
        } else {
            AppState::Setup
        };

        let runtime = tokio::runtime::Runtime::new().expect("Failed to create tokio runtime");
        let (result_tx, result_rx) = channel();

        let today = today();
        let view = match ScheduleView::new(TimelineSettings::from(&config), today) {
            Ok(view) => view,
            Err(e) => {
                log::warn!("Invalid timeline settings ({}), falling back to defaults", e);
                ScheduleView::new(TimelineSettings::from(&Config::default()), today)
                    .expect("Default timeline settings are valid")
            }
        };

        let mut app = Self {
            show_settings: false,
            settings_url: config.backend_url.clone(),
            settings_key: String::new(),
            settings_project: config.project_id.clone().unwrap_or_default(),
            settings_demo: config.demo_mode,
            settings_font_scale: config.font_scale,
            settings_day_width: config.day_width,
            settings_quick_add_days: config.quick_add_days,
            settings_second_press: config.second_press,
            config,
            state,
            view,
            demo_store: Arc::new(Mutex::new(DemoStore::seeded(today))),
            quick_add_form: QuickAddForm::default(),
            scroll_to: None,
            pending_delete: None,
            status: StatusLine::default(),
            loading: false,
            in_flight: 0,
            is_offline: false,
            progress: ProgressBar::default(),
            runtime,
            result_rx,
            result_tx,
        };

        app.scroll_to_current_month();
        if state == AppState::Main {
            app.refresh_data();
        }

        app
    }

    fn scroll_to_current_month(&mut self) {
        let index = self.view.index();
        self.scroll_to = Some(index.position_of(self.view.current_month()));
    }

    fn check_async_results(&mut self) {
        while let Ok(result) = self.result_rx.try_recv() {
            match result {
                AsyncResult::Loaded(lots, companies) => {
                    log::info!("Loaded {} lots and {} companies", lots.len(), companies.len());
                    self.view.set_snapshot(lots);
                    self.view.set_companies(companies);
                    self.loading = false;
                    self.is_offline = false;
                    self.status.clear();
                    self.progress.finish(false);
                }
                AsyncResult::Committed(outcome) => {
                    log::debug!("Store confirmed {:?}", outcome);
                    self.in_flight = self.in_flight.saturating_sub(1);
                    self.view.apply_outcome(outcome);
                    self.is_offline = false;
                    if self.in_flight == 0 {
                        self.progress.finish(false);
                    }
                }
                AsyncResult::CommandFailed { command, message, offline } => {
                    log::warn!("{}", message);
                    self.in_flight = self.in_flight.saturating_sub(1);
                    self.view.command_failed(&command);
                    if offline {
                        self.is_offline = true;
                    } else {
                        self.status.set(message);
                    }
                    self.progress.finish(true);
                }
                AsyncResult::Error(msg) => {
                    log::error!("{}", msg);
                    self.loading = false;
                    self.is_offline = false;
                    self.status.set(msg);
                    self.progress.finish(true);
                }
                AsyncResult::Offline => {
                    log::warn!("Backend unreachable");
                    self.loading = false;
                    self.is_offline = true;
                    self.status.clear();
                    self.progress.finish(true);
                }
            }
        }
    }

    fn backend(&mut self) -> Option<Backend> {
        match Backend::from_config(&self.config, &self.demo_store) {
            Ok(backend) => Some(backend),
            Err(e) => {
                self.status.set(format!("Error: {}", e));
                None
            }
        }
    }

    fn refresh_data(&mut self) {
        if !self.config.is_configured() || self.loading {
            return;
        }
        let Some(backend) = self.backend() else {
            return;
        };

        self.loading = true;
        self.progress.start();
        let tx = self.result_tx.clone();

        self.runtime.spawn(async move {
            match backend.load().await {
                Ok((lots, companies)) => {
                    let _ = tx.send(AsyncResult::Loaded(lots, companies));
                }
                Err(e) if e.is_offline() => {
                    let _ = tx.send(AsyncResult::Offline);
                }
                Err(e) => {
                    let _ = tx.send(AsyncResult::Error(format!("Failed to load lots: {}", e)));
                }
            }
        });
    }

    /// Send a command produced by the timeline to the store. The view has
    /// already recorded any optimistic change.
    fn dispatch(&mut self, command: StoreCommand) {
        let Some(backend) = self.backend() else {
            self.view.command_failed(&command);
            return;
        };

        log::info!("Dispatching {:?}", command);
        self.in_flight += 1;
        self.progress.start();
        let tx = self.result_tx.clone();

        self.runtime.spawn(async move {
            match backend.execute(command.clone()).await {
                Ok(outcome) => {
                    let _ = tx.send(AsyncResult::Committed(outcome));
                }
                Err(e) => {
                    let _ = tx.send(AsyncResult::CommandFailed {
                        offline: e.is_offline(),
                        message: format!("Failed to save: {}", e),
                        command,
                    });
                }
            }
        });
    }

    fn save_settings(&mut self) {
        let project_id = Some(self.settings_project.trim().to_string()).filter(|p| !p.is_empty());

        // Backend changes need a fresh snapshot
        let backend_changed = self.config.backend_url != self.settings_url.trim()
            || self.config.project_id != project_id
            || self.config.demo_mode != self.settings_demo
            || !self.settings_key.is_empty();

        self.config.backend_url = self.settings_url.trim().to_string();
        self.config.project_id = project_id;
        self.config.demo_mode = self.settings_demo;
        self.config.font_scale = self.settings_font_scale;
        self.config.day_width = self.settings_day_width;
        self.config.quick_add_days = self.settings_quick_add_days;
        self.config.second_press = self.settings_second_press;
        if !self.settings_key.is_empty() {
            self.config.api_key = Some(self.settings_key.trim().to_string());
            self.settings_key.clear();
        }
        self.config = std::mem::take(&mut self.config).sanitized();

        if let Err(e) = self.view.apply_settings(TimelineSettings::from(&self.config)) {
            self.status.set(format!("Invalid settings: {}", e));
            return;
        }

        match self.config.save() {
            Ok(_) => {
                self.show_settings = false;
                // Transition from Setup to Main if now configured
                if self.config.is_configured() && self.state == AppState::Setup {
                    self.state = AppState::Main;
                }
                if backend_changed {
                    self.view.set_snapshot(Vec::new());
                    self.refresh_data();
                }
            }
            Err(e) => {
                self.status.set(format!("Failed to save: {}", e));
            }
        }
    }

    fn open_settings(&mut self) {
        self.settings_url = self.config.backend_url.clone();
        self.settings_key.clear();
        self.settings_project = self.config.project_id.clone().unwrap_or_default();
        self.settings_demo = self.config.demo_mode;
        self.settings_font_scale = self.config.font_scale;
        self.settings_day_width = self.view.index().day_width();
        self.settings_quick_add_days = self.config.quick_add_days;
        self.settings_second_press = self.config.second_press;
        self.show_settings = true;
    }

    fn render_setup(&mut self, ui: &mut egui::Ui) {
        ui.vertical_centered(|ui| {
            ui.add_space(40.0);
            ui.heading("Lotline setup");
            ui.add_space(20.0);
            ui.label("Connect to the backend that holds your project's lots.");
            ui.add_space(20.0);
        });

        egui::Grid::new("setup_grid")
            .num_columns(2)
            .spacing([20.0, 10.0])
            .show(ui, |ui| {
                ui.label("Backend URL:");
                ui.add(
                    egui::TextEdit::singleline(&mut self.settings_url)
                        .hint_text("project.supabase.co")
                        .desired_width(350.0)
                );
                ui.end_row();

                ui.label("API key:");
                ui.add(
                    egui::TextEdit::singleline(&mut self.settings_key)
                        .password(true)
                        .hint_text("Paste your API key here")
                        .desired_width(350.0)
                );
                ui.end_row();

                ui.label("Project:");
                ui.add(
                    egui::TextEdit::singleline(&mut self.settings_project)
                        .hint_text("Optional project id")
                        .desired_width(350.0)
                );
                ui.end_row();
            });

        ui.add_space(20.0);

        ui.horizontal(|ui| {
            if ui.button("Save and connect").clicked() {
                self.settings_demo = false;
                self.save_settings();
            }
            if ui.button("Try with sample data").clicked() {
                self.settings_demo = true;
                self.save_settings();
            }
        });
    }

    fn render_main(&mut self, ui: &mut egui::Ui) {
        let today = today();
        let mut refresh = false;
        let mut open_settings = false;

        // Header with month navigation
        ui.horizontal(|ui| {
            let (button_bg, button_text) = super::theme::button_colors();

            egui::Frame::none()
                .fill(button_bg)
                .rounding(egui::Rounding::same(12.0))
                .inner_margin(egui::Margin::symmetric(8.0, 4.0))
                .show(ui, |ui| {
                    ui.horizontal(|ui| {
                        let left_arrow = icon_button(ui, egui_phosphor::regular::CARET_LEFT, button_text);
                        if left_arrow.clicked() {
                            self.view.previous_month();
                            self.scroll_to_current_month();
                        }

                        ui.add_space(4.0);

                        // Min width for the longest month name
                        let month_text = self.view.current_month().format("%B %Y").to_string();
                        ui.allocate_ui_with_layout(
                            egui::vec2(115.0, 14.0),
                            egui::Layout::centered_and_justified(egui::Direction::LeftToRight),
                            |ui| {
                                ui.label(RichText::new(&month_text).size(14.0).color(button_text));
                            }
                        );

                        ui.add_space(4.0);

                        let right_arrow = icon_button(ui, egui_phosphor::regular::CARET_RIGHT, button_text);
                        if right_arrow.clicked() {
                            self.view.next_month();
                            self.scroll_to_current_month();
                        }
                    });
                });

            if ui.button("Today").clicked() {
                self.view.go_to_today(today);
                self.scroll_to = Some((self.view.index().position_of(today) - 200.0).max(0.0));
            }

            ui.add_space(16.0);
            let mut filter = self.view.status_filter();
            if views::render_status_filter(ui, &mut filter) {
                self.view.set_status_filter(filter);
            }

            ui.add_space(16.0);
            views::render_stats_bar(ui, &self.view.stats(today));

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                let icon_color = Color32::from_rgb(160, 160, 152);
                if icon_button(ui, egui_phosphor::regular::GEAR, icon_color).clicked() {
                    open_settings = true;
                }
                if icon_button(ui, egui_phosphor::regular::ARROWS_CLOCKWISE, icon_color).clicked() {
                    refresh = true;
                }
                if self.loading || self.in_flight > 0 {
                    ui.add(egui::Spinner::new());
                }
                if self.is_offline {
                    ui.label(
                        RichText::new(format!("{} Offline", egui_phosphor::regular::WIFI_SLASH))
                            .color(super::theme::DELAYED),
                    );
                }
                if self.config.demo_mode {
                    ui.label(RichText::new("Sample data").color(super::theme::text_colors().1));
                }
            });
        });

        ui.add_space(8.0);

        if self.view.lots().is_empty() && !self.loading {
            ui.label(
                RichText::new("No lots yet. Click anywhere on the timeline to add one.")
                    .color(super::theme::text_colors().1),
            );
        }

        let scroll_to = self.scroll_to.take();
        let result = views::render_timeline(ui, &mut self.view, today, scroll_to);
        if result.quick_add_opened {
            if let Some(draft) = self.view.quick_add().draft() {
                self.quick_add_form.sync_from(draft);
            }
        }
        if let Some(command) = result.command {
            self.dispatch(command);
        }
        if self.view.drag().is_dragging() {
            ui.ctx().request_repaint();
        }

        if refresh {
            self.refresh_data();
        }
        if open_settings {
            self.open_settings();
        }
    }

    fn render_settings(&mut self, ui: &mut egui::Ui) {
        let section_color = Color32::from_rgb(140, 140, 160);

        ui.label(RichText::new("Backend").color(section_color).strong());
        ui.add_space(8.0);

        egui::Grid::new("backend_grid")
            .num_columns(2)
            .spacing([20.0, 10.0])
            .show(ui, |ui| {
                ui.label("Demo mode");
                ui.checkbox(&mut self.settings_demo, "Use sample data, nothing leaves this machine");
                ui.end_row();

                ui.label("URL");
                ui.add_enabled(
                    !self.settings_demo,
                    egui::TextEdit::singleline(&mut self.settings_url).desired_width(350.0),
                );
                ui.end_row();

                ui.label("API key");
                ui.add_enabled(
                    !self.settings_demo,
                    egui::TextEdit::singleline(&mut self.settings_key)
                        .password(true)
                        .hint_text("Leave blank to keep existing")
                        .desired_width(350.0),
                );
                ui.end_row();

                ui.label("Project");
                ui.add_enabled(
                    !self.settings_demo,
                    egui::TextEdit::singleline(&mut self.settings_project)
                        .hint_text("All projects")
                        .desired_width(350.0),
                );
                ui.end_row();
            });

        ui.add_space(20.0);

        ui.label(RichText::new("Timeline").color(section_color).strong());
        ui.add_space(8.0);

        egui::Grid::new("timeline_grid")
            .num_columns(2)
            .spacing([20.0, 10.0])
            .show(ui, |ui| {
                ui.label("Font scale");
                ui.horizontal(|ui| {
                    ui.add(egui::Slider::new(&mut self.settings_font_scale, 0.75..=2.0).show_value(false));
                    ui.label(format!("{:.0}%", self.settings_font_scale * 100.0));
                });
                ui.end_row();

                ui.label("Day width");
                ui.horizontal(|ui| {
                    ui.add(egui::Slider::new(&mut self.settings_day_width, MIN_DAY_WIDTH..=MAX_DAY_WIDTH).show_value(false));
                    ui.label(format!("{:.0} px", self.settings_day_width));
                });
                ui.end_row();

                ui.label("New lot length");
                ui.horizontal(|ui| {
                    ui.add(egui::DragValue::new(&mut self.settings_quick_add_days).range(0..=365));
                    ui.label("days");
                });
                ui.end_row();

                ui.label("Second press while dragging");
                ui.horizontal(|ui| {
                    ui.radio_value(&mut self.settings_second_press, SecondPressPolicy::Ignore, "Ignore");
                    ui.radio_value(&mut self.settings_second_press, SecondPressPolicy::Restart, "Restart drag");
                });
                ui.end_row();
            });

        ui.add_space(24.0);

        ui.horizontal(|ui| {
            let text_color = Color32::from_rgb(180, 180, 190);
            if dialog_button(ui, "Save", text_color).clicked() {
                self.save_settings();
            }
            if dialog_button(ui, "Cancel", text_color).clicked() {
                self.show_settings = false;
            }
        });
    }

    fn render_delete_confirm(&mut self, ctx: &egui::Context) {
        let Some((lot_id, lot_name)) = self.pending_delete.clone() else {
            return;
        };
        let mut do_delete = false;
        let mut cancel_delete = false;
        let (content_bg, frame_color) = super::theme::dialog_colors();

        egui::Window::new("Delete lot")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
            .frame(
                egui::Frame::none()
                    .fill(content_bg)
                    .stroke(egui::Stroke::new(2.0, frame_color))
                    .rounding(egui::Rounding::same(8.0))
                    .inner_margin(egui::Margin::same(20.0)),
            )
            .show(ctx, |ui| {
                ui.label(format!("Delete \"{}\"? This cannot be undone.", lot_name));
                ui.add_space(20.0);
                ui.horizontal(|ui| {
                    let delete_color = Color32::from_rgb(224, 108, 117);
                    let text_color = Color32::from_rgb(180, 180, 190);
                    if dialog_button(ui, "Delete", delete_color).clicked() {
                        do_delete = true;
                    }
                    if dialog_button(ui, "Cancel", text_color).clicked() {
                        cancel_delete = true;
                    }
                });
            });

        if do_delete {
            self.pending_delete = None;
            if let Some(command) = self.view.delete_command(&lot_id) {
                self.dispatch(command);
            }
        }
        if cancel_delete {
            self.pending_delete = None;
        }
    }
}

/// Clickable icon label with a pointing-hand cursor
fn icon_button(ui: &mut egui::Ui, icon: &str, color: Color32) -> egui::Response {
    let response = ui.add(egui::Label::new(
        RichText::new(icon).size(14.0).color(color)
    ).sense(egui::Sense::click()));
    if response.hovered() {
        ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
    }
    response
}

/// Flat dialog button with hover effect
fn dialog_button(ui: &mut egui::Ui, text: &str, text_color: Color32) -> egui::Response {
    let btn_bg = Color32::from_rgb(0x28, 0x28, 0x26);
    let btn_hover = Color32::from_rgb(0x50, 0x50, 0x4a);
    let font_id = egui::FontId::proportional(17.0);
    let padding = egui::vec2(18.0, 10.0);

    let size = ui.fonts(|f| f.layout_no_wrap(text.to_string(), font_id.clone(), text_color).size());
    let (rect, response) = ui.allocate_exact_size(size + padding * 2.0, egui::Sense::click());
    let bg = if response.hovered() { btn_hover } else { btn_bg };
    ui.painter().rect_filled(rect, egui::Rounding::same(6.0), bg);
    ui.painter().text(rect.center(), egui::Align2::CENTER_CENTER, text, font_id, text_color);
    response
}

impl eframe::App for LotlineApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        // Pinch or Ctrl+scroll zooms the timeline
        let zoom_delta = ctx.input(|i| i.zoom_delta());
        if zoom_delta != 1.0 && self.state == AppState::Main {
            let width = (self.view.index().day_width() * zoom_delta).clamp(MIN_DAY_WIDTH, MAX_DAY_WIDTH);
            if self.view.set_day_width(width).is_ok() {
                self.config.day_width = width;
                if (zoom_delta - 1.0).abs() > 0.01 {
                    if let Err(e) = self.config.save() {
                        log::warn!("Failed to save zoom level: {:#}", e);
                    }
                }
            }
        }

        ctx.set_pixels_per_point(self.config.font_scale);

        self.check_async_results();
        if self.progress.tick() {
            ctx.request_repaint();
        }

        // Escape closes the innermost thing that is open
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            if self.pending_delete.take().is_none() && !self.view.escape() {
                self.show_settings = false;
            }
        }

        let today = today();

        if self.state == AppState::Main {
            if let Some(command) = views::render_quick_add(ctx, &mut self.view, &mut self.quick_add_form, today) {
                self.dispatch(command);
            }
        }

        if self.show_settings {
            let (content_bg, frame_color) = super::theme::dialog_colors();
            egui::Window::new("Settings")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                .frame(
                    egui::Frame::none()
                        .fill(content_bg)
                        .stroke(egui::Stroke::new(2.0, frame_color))
                        .rounding(egui::Rounding::same(8.0))
                        .inner_margin(egui::Margin::same(20.0)),
                )
                .show(ctx, |ui| self.render_settings(ui));
        }

        self.render_delete_confirm(ctx);

        if self.state == AppState::Main && self.view.selected().is_some() {
            egui::SidePanel::right("lot_detail")
                .resizable(false)
                .exact_width(260.0)
                .show(ctx, |ui| {
                    ui.add_space(12.0);
                    let detail = views::render_detail_panel(ui, &mut self.view, today);
                    if let Some(command) = detail.command {
                        self.dispatch(command);
                    }
                    if detail.delete_requested.is_some() {
                        self.pending_delete = detail.delete_requested;
                    }
                    if detail.closed {
                        self.view.select(None);
                    }
                });
        }

        egui::CentralPanel::default().frame(
            egui::Frame::none().inner_margin(egui::Margin::symmetric(12.0, 0.0))
        ).show(ctx, |ui| {
            self.progress.show(ui, 4.0);
            if !self.loading {
                self.status.show(ui);
            }

            match self.state {
                AppState::Setup => self.render_setup(ui),
                AppState::Main => self.render_main(ui),
            }
        });
    }
}
