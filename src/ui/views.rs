use chrono::{Datelike, NaiveDate, Weekday};
use egui::{Color32, Pos2, Rect, RichText, Sense, Stroke, Ui};

use super::theme;
use crate::api::{format_date, format_short, parse_user_date, LotId, LotStatus, StoreCommand};
use crate::timeline::{month_runs, week_runs, DragKind, LotRow, QuickAddDraft, ScheduleStats, ScheduleView};

const LABEL_WIDTH: f32 = 220.0;
const MONTH_HEADER: f32 = 22.0;
const WEEK_HEADER: f32 = 18.0;
const DAY_HEADER: f32 = 18.0;
const ROW_HEIGHT: f32 = 30.0;
const BAR_MARGIN: f32 = 5.0;

/// Interactions collected while drawing the timeline
#[derive(Default)]
pub struct TimelineResult {
    pub command: Option<StoreCommand>,
    pub quick_add_opened: bool,
}

/// Text buffers behind the quick-add window. Dates are applied to the draft
/// when a field loses focus, so half-typed dates never reorder the range.
#[derive(Default)]
pub struct QuickAddForm {
    pub name: String,
    pub start_text: String,
    pub end_text: String,
    pub start_error: bool,
    pub end_error: bool,
}

impl QuickAddForm {
    pub fn sync_from(&mut self, draft: &QuickAddDraft) {
        self.name = draft.name.clone();
        self.start_text = draft.start_date.map(format_date).unwrap_or_default();
        self.end_text = draft.end_date.map(format_date).unwrap_or_default();
        self.start_error = false;
        self.end_error = false;
    }
}

/// What the detail panel asked for
#[derive(Default)]
pub struct DetailResult {
    pub command: Option<StoreCommand>,
    pub delete_requested: Option<(LotId, String)>,
    pub closed: bool,
}

pub fn render_stats_bar(ui: &mut Ui, stats: &ScheduleStats) {
    let (primary, secondary) = theme::text_colors();
    ui.horizontal(|ui| {
        ui.label(RichText::new(format!("{} lots", stats.total)).color(primary).strong());
        ui.label(RichText::new(format!("{} scheduled", stats.scheduled)).color(secondary));
        for status in [LotStatus::InProgress, LotStatus::Completed] {
            ui.label(RichText::new("●").color(theme::status_color(status)));
            ui.label(RichText::new(format!("{} {}", stats.count(status), status.label().to_lowercase())).color(secondary));
        }
        if stats.delayed > 0 {
            ui.label(
                RichText::new(format!("{} {} delayed", egui_phosphor::regular::WARNING, stats.delayed))
                    .color(theme::DELAYED),
            );
        }
    });
}

/// Status filter dropdown. Returns true when the filter changed.
pub fn render_status_filter(ui: &mut Ui, filter: &mut Option<LotStatus>) -> bool {
    let before = *filter;
    let selected_text = filter.map(|s| s.label()).unwrap_or("All statuses");
    egui::ComboBox::from_id_salt("status_filter")
        .selected_text(selected_text)
        .width(140.0)
        .show_ui(ui, |ui| {
            ui.selectable_value(filter, None, "All statuses");
            for status in LotStatus::ALL {
                ui.selectable_value(filter, Some(status), status.label());
            }
        });
    *filter != before
}

pub fn render_timeline(ui: &mut Ui, view: &mut ScheduleView, today: NaiveDate, scroll_to: Option<f32>) -> TimelineResult {
    let mut result = TimelineResult::default();
    let index = *view.index();
    let days = index.days();
    let rows = view.rows(today);
    let day_width = index.day_width();
    let header_height = MONTH_HEADER + WEEK_HEADER + DAY_HEADER;
    let (grid_line, weekend_fill, row_alt_fill) = theme::grid_colors();
    let (primary_text, secondary_text) = theme::text_colors();

    let mut scroll = egui::ScrollArea::both().auto_shrink([false, false]);
    if let Some(x) = scroll_to {
        scroll = scroll.horizontal_scroll_offset(x.max(0.0));
    }

    scroll.show(ui, |ui| {
        // One spare row at the bottom to click-create into
        let content_height = header_height + (rows.len() + 1) as f32 * ROW_HEIGHT;
        let size = egui::vec2(LABEL_WIDTH + index.total_width(), content_height.max(ui.available_height()));
        let (rect, surface) = ui.allocate_exact_size(size, Sense::click_and_drag());
        let painter = ui.painter_at(rect);

        let origin_x = rect.min.x + LABEL_WIDTH;
        let rows_top = rect.min.y + header_height;
        let to_screen = |x: f32| origin_x + x;

        // Weekend shading
        for (i, day) in days.iter().enumerate() {
            let x = to_screen(i as f32 * day_width);
            let column = Rect::from_min_max(Pos2::new(x, rows_top), Pos2::new(x + day_width, rect.max.y));
            if matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
                painter.rect_filled(column, 0.0, weekend_fill);
            }
        }

        // Alternating rows
        for i in 0..=rows.len() {
            let y = rows_top + i as f32 * ROW_HEIGHT;
            if i % 2 == 1 {
                painter.rect_filled(
                    Rect::from_min_size(Pos2::new(rect.min.x, y), egui::vec2(rect.width(), ROW_HEIGHT)),
                    0.0,
                    row_alt_fill,
                );
            }
            painter.line_segment(
                [Pos2::new(rect.min.x, y + ROW_HEIGHT), Pos2::new(rect.max.x, y + ROW_HEIGHT)],
                Stroke::new(0.5, grid_line),
            );
        }

        // Month header row
        for run in month_runs(&days) {
            let x = to_screen(run.start_index as f32 * day_width);
            let w = run.day_count as f32 * day_width;
            let cell = Rect::from_min_size(Pos2::new(x, rect.min.y), egui::vec2(w, MONTH_HEADER));
            painter.with_clip_rect(cell).text(
                Pos2::new(x + 6.0, cell.center().y),
                egui::Align2::LEFT_CENTER,
                run.label(),
                egui::FontId::proportional(13.0),
                primary_text,
            );
            painter.line_segment(
                [Pos2::new(x, rect.min.y), Pos2::new(x, rect.max.y)],
                Stroke::new(1.0, grid_line),
            );
        }

        // ISO week row
        let week_top = rect.min.y + MONTH_HEADER;
        for run in week_runs(&days, today) {
            let x = to_screen(run.start_index as f32 * day_width);
            let w = run.day_count as f32 * day_width;
            let cell = Rect::from_min_size(Pos2::new(x, week_top), egui::vec2(w, WEEK_HEADER));
            if run.contains_today {
                painter.rect_filled(cell.shrink(1.0), 3.0, theme::ACCENT.gamma_multiply(0.35));
            }
            painter.with_clip_rect(cell).text(
                cell.center(),
                egui::Align2::CENTER_CENTER,
                format!("W{}", run.week),
                egui::FontId::proportional(11.0),
                secondary_text,
            );
        }

        // Day numbers, only when there is room for them
        if day_width >= 14.0 {
            let day_top = week_top + WEEK_HEADER;
            for (i, day) in days.iter().enumerate() {
                let x = to_screen(i as f32 * day_width);
                let color = if *day == today { theme::TODAY_LINE } else { secondary_text };
                painter.text(
                    Pos2::new(x + day_width / 2.0, day_top + DAY_HEADER / 2.0),
                    egui::Align2::CENTER_CENTER,
                    day.day().to_string(),
                    egui::FontId::proportional(10.0),
                    color,
                );
            }
        }

        painter.line_segment(
            [Pos2::new(rect.min.x, rows_top), Pos2::new(rect.max.x, rows_top)],
            Stroke::new(1.0, grid_line),
        );

        // Rows: label column and bars
        let pointer = ui.ctx().pointer_latest_pos();
        for (i, row) in rows.iter().enumerate() {
            let y = rows_top + i as f32 * ROW_HEIGHT;
            render_row_label(&painter, rect.min.x, y, row);

            match row.bar {
                Some(bar) => {
                    let bar_rect = Rect::from_min_max(
                        Pos2::new(to_screen(bar.left), y + BAR_MARGIN),
                        Pos2::new(to_screen(bar.right), y + ROW_HEIGHT - BAR_MARGIN),
                    );
                    render_bar(&painter, bar_rect, row);

                    // Cursor hint when hovering (not during drag)
                    if !view.drag().is_dragging() {
                        if let Some(pos) = pointer.filter(|p| bar_rect.contains(*p)) {
                            let kind = DragKind::classify(pos.x, bar_rect.left(), bar_rect.right(), view.drag().handle_band());
                            ui.ctx().set_cursor_icon(match kind {
                                DragKind::Move => egui::CursorIcon::Grab,
                                _ => egui::CursorIcon::ResizeHorizontal,
                            });
                        }
                    }
                }
                None => {
                    let hint_y = y + ROW_HEIGHT / 2.0;
                    let hint_left = Pos2::new(origin_x + 4.0, hint_y);
                    let hint_right = Pos2::new(rect.max.x - 4.0, hint_y);
                    painter.extend(egui::Shape::dashed_line(
                        &[hint_left, hint_right],
                        Stroke::new(1.0, grid_line),
                        6.0,
                        6.0,
                    ));
                    if let Some(pos) = pointer.filter(|p| p.y >= y && p.y < y + ROW_HEIGHT && p.x >= origin_x) {
                        painter.text(
                            Pos2::new(pos.x + 12.0, hint_y),
                            egui::Align2::LEFT_CENTER,
                            format!("{} Click to schedule", egui_phosphor::regular::CALENDAR_PLUS),
                            egui::FontId::proportional(12.0),
                            secondary_text,
                        );
                    }
                }
            }
        }

        // Today marker
        if index.contains(today) {
            let x = to_screen(index.position_of(today) + day_width / 2.0);
            painter.line_segment(
                [Pos2::new(x, rows_top), Pos2::new(x, rect.max.y)],
                Stroke::new(1.5, theme::TODAY_LINE),
            );
        }

        // Pointer routing. The drag surface is the visible part of the
        // timeline area, excluding headers and the label column.
        let surface_rect = Rect::from_min_max(Pos2::new(origin_x, rows_top), rect.max)
            .intersect(ui.clip_rect());
        let inside = pointer.is_some_and(|p| surface_rect.contains(p));
        let pressed = ui.input(|i| i.pointer.primary_pressed());
        let released = ui.input(|i| i.pointer.primary_released());

        let hit = pointer.and_then(|p| {
            let row = ((p.y - rows_top) / ROW_HEIGHT).floor();
            (row >= 0.0).then(|| (row as usize, p.x - origin_x))
        });
        let bar_hit = hit.and_then(|(row, x)| {
            rows.get(row)
                .filter(|r| r.bar.is_some_and(|b| x >= b.left && x <= b.right))
                .map(|r| (r.lot.id.clone(), x))
        });

        // A press lands on a bar whether or not a drag is running; the
        // configured second-press policy decides what happens mid-drag.
        if pressed && inside {
            if let Some((id, x)) = &bar_hit {
                if view.pointer_down_on_bar(id, *x) {
                    ui.ctx().request_repaint();
                }
            }
        }

        if view.drag().is_dragging() {
            match pointer {
                Some(pos) if inside && released => {
                    result.command = view.pointer_up_at(pos.x - origin_x);
                }
                Some(pos) if inside => {
                    if view.pointer_move(pos.x - origin_x) {
                        ui.ctx().request_repaint();
                    }
                    ui.ctx().set_cursor_icon(match view.drag().active().map(|s| s.kind) {
                        Some(DragKind::Move) => egui::CursorIcon::Grabbing,
                        _ => egui::CursorIcon::ResizeHorizontal,
                    });
                }
                _ => {
                    if view.pointer_leave() {
                        log::info!("Drag abandoned outside the timeline");
                    }
                }
            }
        }

        // Plain clicks on empty space or on an undated row open a draft
        if surface.clicked() && inside && !view.drag().is_dragging() {
            if let Some((row, x)) = hit {
                match rows.get(row) {
                    Some(lot_row) if lot_row.bar.is_none() => {
                        result.quick_add_opened = view.click_undated(&lot_row.lot.id, x);
                    }
                    Some(lot_row) if lot_row.bar.is_some_and(|b| x >= b.left && x <= b.right) => {}
                    _ => {
                        result.quick_add_opened = view.click_empty(x);
                    }
                }
            }
        }

        // Ghost of the draft being composed
        if let Some(draft) = view.quick_add().draft() {
            if let (Some(start), Some(end)) = (draft.start_date, draft.end_date) {
                let (left, right) = index.span_of(start, end);
                let row = draft
                    .target
                    .as_deref()
                    .and_then(|id| rows.iter().position(|r| r.lot.id == id))
                    .unwrap_or(rows.len());
                let y = rows_top + row as f32 * ROW_HEIGHT;
                let ghost = Rect::from_min_max(
                    Pos2::new(to_screen(left), y + BAR_MARGIN),
                    Pos2::new(to_screen(right), y + ROW_HEIGHT - BAR_MARGIN),
                );
                let ghost_color = Color32::from_rgba_unmultiplied(0x61, 0xAF, 0xEF, 60);
                let ghost_border = Color32::from_rgba_unmultiplied(0x61, 0xAF, 0xEF, 120);
                painter.rect(ghost, 4.0, ghost_color, Stroke::new(1.0, ghost_border));
            }
        }
    });

    result
}

fn render_row_label(painter: &egui::Painter, left: f32, y: f32, row: &LotRow) {
    let (primary_text, secondary_text) = theme::text_colors();
    let cell = Rect::from_min_size(Pos2::new(left, y), egui::vec2(LABEL_WIDTH - 8.0, ROW_HEIGHT));
    let painter = painter.with_clip_rect(cell);

    painter.circle_filled(
        Pos2::new(left + 12.0, cell.center().y),
        4.0,
        theme::status_color(row.lot.status),
    );

    let name_color = if row.selected { theme::ACCENT } else { primary_text };
    let name = if row.delayed {
        format!("{} {}", egui_phosphor::regular::WARNING, row.lot.name)
    } else {
        row.lot.name.clone()
    };
    let name_y = if row.company.is_some() { y + 10.0 } else { cell.center().y };
    painter.text(
        Pos2::new(left + 24.0, name_y),
        egui::Align2::LEFT_CENTER,
        name,
        egui::FontId::proportional(13.0),
        if row.delayed { theme::DELAYED } else { name_color },
    );
    if let Some(company) = &row.company {
        painter.text(
            Pos2::new(left + 24.0, y + 22.0),
            egui::Align2::LEFT_CENTER,
            company,
            egui::FontId::proportional(10.0),
            secondary_text,
        );
    }
}

fn render_bar(painter: &egui::Painter, bar_rect: Rect, row: &LotRow) {
    let base = theme::lot_color(&row.lot);
    let fill = if row.provisional { base.gamma_multiply(0.6) } else { base };
    painter.rect_filled(bar_rect, 4.0, fill);

    if row.selected {
        painter.rect_stroke(bar_rect, 4.0, Stroke::new(2.0, Color32::WHITE));
    } else if row.delayed {
        painter.rect_stroke(bar_rect, 4.0, Stroke::new(1.5, theme::DELAYED));
    }

    // Resize grips
    let grip = Color32::from_white_alpha(90);
    for x in [bar_rect.left() + 3.0, bar_rect.right() - 3.0] {
        painter.line_segment(
            [Pos2::new(x, bar_rect.top() + 5.0), Pos2::new(x, bar_rect.bottom() - 5.0)],
            Stroke::new(1.0, grip),
        );
    }

    let label = match (row.dragging, row.lot.dates()) {
        (true, Some((start, end))) => format!("{} → {}", format_short(start), format_short(end)),
        _ => row.lot.name.clone(),
    };
    painter.with_clip_rect(bar_rect.shrink(2.0)).text(
        Pos2::new(bar_rect.left() + 8.0, bar_rect.center().y),
        egui::Align2::LEFT_CENTER,
        label,
        egui::FontId::proportional(12.0),
        Color32::WHITE,
    );
}

/// Inline form for the quick-add draft. Returns the command when submitted.
pub fn render_quick_add(ctx: &egui::Context, view: &mut ScheduleView, form: &mut QuickAddForm, today: NaiveDate) -> Option<StoreCommand> {
    let draft = view.quick_add().draft()?.clone();
    let placing = draft.target.is_some();
    let title = if placing { "Schedule lot" } else { "New lot" };

    let mut command = None;
    let mut cancel = false;
    let (content_bg, frame_color) = theme::dialog_colors();
    let frame = egui::Frame::none()
        .fill(content_bg)
        .stroke(Stroke::new(2.0, frame_color))
        .rounding(egui::Rounding::same(8.0))
        .inner_margin(egui::Margin::same(16.0));

    egui::Window::new(title)
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_TOP, [0.0, 80.0])
        .frame(frame)
        .show(ctx, |ui| {
            let mut submit = false;

            egui::Grid::new("quick_add_grid")
                .num_columns(2)
                .spacing([16.0, 8.0])
                .show(ui, |ui| {
                    ui.label("Name");
                    let name_response = ui.add_enabled(
                        !placing,
                        egui::TextEdit::singleline(&mut form.name)
                            .hint_text("e.g. Plumbing")
                            .desired_width(240.0),
                    );
                    if !placing && form.name.is_empty() && ui.memory(|m| m.focused().is_none()) {
                        name_response.request_focus();
                    }
                    if name_response.changed() {
                        view.quick_add_mut().set_name(&form.name);
                    }
                    if name_response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        submit = true;
                    }
                    ui.end_row();

                    ui.label("Start");
                    let start = date_field(ui, &mut form.start_text, form.start_error);
                    ui.end_row();

                    ui.label("End");
                    let end = date_field(ui, &mut form.end_text, form.end_error);
                    ui.end_row();

                    let date_left = start.lost_focus() || end.lost_focus();
                    if date_left && ui.input(|i| i.key_pressed(egui::Key::Enter)) {
                        submit = true;
                    }
                    if date_left || submit {
                        apply_dates(view, form, today.year());
                    }
                });

            ui.add_space(8.0);
            ui.horizontal(|ui| {
                let ready = view.quick_add().can_submit() && !form.start_error && !form.end_error;
                let label = if placing { "Schedule" } else { "Add" };
                if ui.add_enabled(ready, egui::Button::new(label)).clicked() {
                    apply_dates(view, form, today.year());
                    submit = true;
                }
                if ui.button("Cancel").clicked() {
                    cancel = true;
                }
                if form.name.trim().is_empty() && !placing {
                    ui.label(RichText::new("Name required").color(theme::DELAYED).small());
                }
            });

            if submit && !form.start_error && !form.end_error {
                command = view.enter();
            }
        });

    if cancel {
        view.escape();
    }
    command
}

fn date_field(ui: &mut Ui, text: &mut String, error: bool) -> egui::Response {
    let mut edit = egui::TextEdit::singleline(text)
        .hint_text("YYYY-MM-DD")
        .desired_width(120.0);
    if error {
        edit = edit.text_color(theme::DELAYED);
    }
    ui.add(edit)
}

/// Push the typed dates into the draft and show back what it kept, which
/// may be swapped
fn apply_dates(view: &mut ScheduleView, form: &mut QuickAddForm, year: i32) {
    let start = parse_user_date(&form.start_text, year);
    let end = parse_user_date(&form.end_text, year);
    form.start_error = start.is_none();
    form.end_error = end.is_none();

    let quick = view.quick_add_mut();
    quick.set_start_date(start);
    quick.set_end_date(end);
    if let Some(draft) = quick.draft() {
        if let (Some(s), Some(e)) = (draft.start_date, draft.end_date) {
            form.start_text = format_date(s);
            form.end_text = format_date(e);
        }
    }
}

pub fn render_detail_panel(ui: &mut Ui, view: &mut ScheduleView, today: NaiveDate) -> DetailResult {
    let mut result = DetailResult::default();
    let Some(lot) = view.selected().and_then(|id| view.confirmed_lot(id)) else {
        return result;
    };
    let (primary_text, secondary_text) = theme::text_colors();

    ui.horizontal(|ui| {
        ui.label(RichText::new(&lot.name).size(16.0).color(primary_text).strong());
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            if ui.button(egui_phosphor::regular::X).clicked() {
                result.closed = true;
            }
        });
    });
    if let Some(company) = view.company_name(lot.company_id.as_deref()) {
        ui.label(RichText::new(company).color(secondary_text));
    }
    ui.add_space(8.0);

    egui::Grid::new("lot_detail_grid")
        .num_columns(2)
        .spacing([16.0, 8.0])
        .show(ui, |ui| {
            ui.label("Start");
            ui.label(lot.start_date.map(format_date).unwrap_or_else(|| "-".into()));
            ui.end_row();

            ui.label("End");
            ui.label(lot.end_date.map(format_date).unwrap_or_else(|| "-".into()));
            ui.end_row();

            if let Some((start, end)) = lot.dates() {
                ui.label("Duration");
                ui.label(format!("{} days", (end - start).num_days() + 1));
                ui.end_row();
            }

            ui.label("Status");
            let mut status = lot.status;
            egui::ComboBox::from_id_salt("lot_status")
                .selected_text(status.label())
                .show_ui(ui, |ui| {
                    for option in LotStatus::ALL {
                        ui.selectable_value(&mut status, option, option.label());
                    }
                });
            if status != lot.status {
                result.command = view.status_command(&lot.id, status);
            }
            ui.end_row();
        });

    if crate::timeline::is_delayed(&lot, today) {
        ui.add_space(4.0);
        ui.label(
            RichText::new(format!("{} Past its end date", egui_phosphor::fill::WARNING))
                .family(theme::phosphor_fill_family())
                .color(theme::DELAYED),
        );
    }
    if view.has_pending(&lot.id) {
        ui.label(RichText::new("Saving…").color(secondary_text).small());
    }

    ui.add_space(16.0);
    let delete = egui::Button::new(
        RichText::new(format!("{} Delete lot", egui_phosphor::regular::TRASH)).color(theme::DELAYED),
    );
    if ui.add(delete).clicked() {
        result.delete_requested = Some((lot.id.clone(), lot.name.clone()));
    }

    result
}
