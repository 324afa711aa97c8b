use crate::brush::Brush;
use crate::canvas::{Canvas, ToolEvent, ToolKind};
use crate::geometry::{PixelPosition, Resolution};
use crate::input::{InputEvent, InputHandler};
use crate::project::ProjectState;
use crate::render::{BlendMode, DrawList, GlRenderer, RenderContext};
use crate::settings::CanvasSettings;
use eframe::{egui_glow, glow};
use egui::color_picker::{color_edit_button_srgba, Alpha};
use egui::{Color32, PointerButton, Rect, Sense};
use image::Rgba;
use parking_lot::Mutex;
use std::sync::Arc;

/// Storage key of the persisted [`CanvasSettings`]
const SETTINGS_KEY: &str = "canvas_settings";

const MAX_BRUSH_SIZE: u32 = 32;
const MAX_RESOLUTION: u32 = 1024;

pub struct MousetrapApp {
    render: RenderContext,
    project: ProjectState,
    settings: CanvasSettings,
    canvas: Canvas,
    input: InputHandler,
    /// Shared with the paint callback; `None` without a GL context
    gl_renderer: Option<Arc<Mutex<GlRenderer>>>,
    /// Rebuilt whenever a canvas layer queues a render
    draw_list: Arc<DrawList>,
    // Side panel state
    new_resolution: Resolution,
    brush_size: u32,
    brush_round: bool,
}

impl MousetrapApp {
    /// Called once before the first frame.
    pub fn new(cc: &eframe::CreationContext<'_>) -> Self {
        let settings: CanvasSettings = cc
            .storage
            .and_then(|storage| eframe::get_value(storage, SETTINGS_KEY))
            .unwrap_or_default();

        let render = RenderContext::new(cc.egui_ctx.clone());
        let gl_renderer = match cc.gl.as_ref() {
            Some(gl) => match GlRenderer::new(gl, render.shaders()) {
                Ok(renderer) => Some(Arc::new(Mutex::new(renderer))),
                Err(err) => {
                    log::error!("Failed to set up the canvas renderer: {}", err);
                    None
                }
            },
            None => {
                log::error!("No OpenGL context, the canvas will not be drawn");
                None
            }
        };

        let mut project = ProjectState::default();
        if let Err(err) = project.update_textures(&render) {
            log::error!("Failed to upload layer textures: {}", err);
        }
        let mut canvas = Canvas::new(&render, &settings);
        canvas.realize(&project, &settings);

        let new_resolution = project.layer_resolution();
        let brush_size = project.brush().size();
        Self {
            render,
            project,
            settings,
            canvas,
            input: InputHandler::new(),
            gl_renderer,
            draw_list: Arc::new(DrawList::default()),
            new_resolution,
            brush_size,
            brush_round: false,
        }
    }

    /// Writes a finished tool operation into the current layer
    fn commit(&mut self, event: ToolEvent) {
        let stamp = event.stamp(self.project.brush());
        let color = self.project.primary_color();
        match self.project.stamp_pixels(&stamp, color) {
            Ok(count) => log::debug!("{:?} changed {} pixels", event, count),
            Err(err) => log::warn!("Cannot draw: {}", err),
        }
    }

    fn handle_event(&mut self, event: InputEvent) {
        let (project, settings) = (&self.project, &self.settings);
        match event {
            InputEvent::PointerMove { location, held_buttons } => {
                let moved = self.canvas.pointer_motion(location.position, project, settings);
                if moved.is_some()
                    && self.canvas.active_tool() == ToolKind::Brush
                    && held_buttons.contains(&PointerButton::Primary)
                {
                    let center = self.canvas.current_pixel_position();
                    self.commit(ToolEvent::Brush { center });
                }
            }
            InputEvent::PointerLeave => self.canvas.pointer_leave(project, settings),
            InputEvent::PointerDown { location, button } if location.is_in_canvas => match button {
                PointerButton::Primary => {
                    if let Some(event) = self.canvas.pointer_click(location.position, project, settings) {
                        self.commit(event);
                    }
                }
                PointerButton::Secondary => self.canvas.cancel_tool(project, settings),
                _ => {}
            },
            InputEvent::Scroll { delta, .. } => {
                if delta > 0.0 {
                    self.canvas.zoom_in(project, settings);
                } else {
                    self.canvas.zoom_out(project, settings);
                }
            }
            InputEvent::Pan { delta } => self.canvas.pan(delta, project, settings),
            InputEvent::KeyDown { key: egui::Key::Escape } => self.canvas.cancel_tool(project, settings),
            InputEvent::PointerDown { .. } | InputEvent::PointerUp { .. } | InputEvent::KeyDown { .. } => {}
        }
    }

    fn tools_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("Tools");
        ui.horizontal_wrapped(|ui| {
            for tool in ToolKind::ALL {
                if ui.selectable_label(self.canvas.active_tool() == tool, tool.name()).clicked() {
                    self.canvas.set_active_tool(tool, &self.project, &self.settings);
                }
            }
        });

        let mut color = {
            let [r, g, b, a] = self.project.primary_color().0;
            Color32::from_rgba_unmultiplied(r, g, b, a)
        };
        ui.horizontal(|ui| {
            ui.label("Color");
            if color_edit_button_srgba(ui, &mut color, Alpha::OnlyBlend).changed() {
                self.project.set_primary_color(Rgba(color.to_srgba_unmultiplied()));
            }
        });

        let size_changed = ui
            .add(egui::Slider::new(&mut self.brush_size, 1..=MAX_BRUSH_SIZE).text("Brush"))
            .changed();
        let shape_changed = ui.checkbox(&mut self.brush_round, "Round brush").changed();
        if size_changed || shape_changed {
            let brush = if self.brush_round {
                Brush::circle(self.brush_size)
            } else {
                Brush::square(self.brush_size)
            };
            self.project.set_brush(brush);
        }

        ui.horizontal(|ui| {
            if ui.button("Select all").clicked() {
                self.project.select_all();
            }
            if ui.button("Deselect").clicked() {
                self.project.clear_selection();
            }
        });
    }

    fn view_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("View");
        if ui.checkbox(&mut self.settings.grid_visible, "Grid").changed() {
            self.canvas.set_grid_visible(self.settings.grid_visible);
        }
        ui.horizontal(|ui| {
            if ui.button("−").clicked() {
                self.canvas.zoom_out(&self.project, &self.settings);
            }
            ui.label(format!("{:.0}%", self.canvas.transform_scale() * 100.0));
            if ui.button("+").clicked() {
                self.canvas.zoom_in(&self.project, &self.settings);
            }
            if ui.button("Fit").clicked() {
                self.canvas.fit_to_viewport(&self.project, &self.settings);
            }
            if ui.button("1:1").clicked() {
                self.canvas.reset_transform(&self.project, &self.settings);
            }
        });

        let mut changed = false;
        ui.collapsing("Colors", |ui| {
            for (label, color) in [
                ("Grid", &mut self.settings.grid_color),
                ("Cursor", &mut self.settings.cursor_color),
                ("Selection", &mut self.settings.selection_outline_color),
                ("Checker light", &mut self.settings.checkerboard_light),
                ("Checker dark", &mut self.settings.checkerboard_dark),
            ] {
                ui.horizontal(|ui| {
                    ui.label(label);
                    changed |= color_edit_button_srgba(ui, color, Alpha::OnlyBlend).changed();
                });
            }
            changed |= ui
                .add(egui::Slider::new(&mut self.settings.checkerboard_tile_size, 2.0..=64.0).text("Tile"))
                .changed();
        });
        if changed {
            self.canvas.apply_settings(&self.project, &self.settings);
        }
    }

    fn layers_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("Layers");
        for index in (0..self.project.layer_count()).rev() {
            let Some(layer) = self.project.layer(index) else {
                continue;
            };
            let name = layer.name.clone();
            let mut visible = layer.is_visible;
            let mut locked = layer.is_locked;
            let current = self.project.current_layer() == index;

            ui.horizontal(|ui| {
                if ui.checkbox(&mut visible, "").on_hover_text("Visible").changed() {
                    log_error(self.project.set_layer_visible(index, visible));
                }
                if ui.checkbox(&mut locked, "").on_hover_text("Locked").changed() {
                    log_error(self.project.set_layer_locked(index, locked));
                }
                if ui.selectable_label(current, name).clicked() {
                    log_error(self.project.set_current_layer(index));
                }
            });
        }

        let current = self.project.current_layer();
        ui.horizontal(|ui| {
            if ui.button("Add").clicked() {
                let name = format!("Layer {}", self.project.layer_count() + 1);
                self.project.add_layer(&name);
            }
            if ui.button("Delete").clicked() {
                log_error(self.project.delete_layer(current));
            }
            if ui.button("Up").clicked() && current + 1 < self.project.layer_count() {
                log_error(self.project.move_layer(current, current + 1));
            }
            if ui.button("Down").clicked() && current > 0 {
                log_error(self.project.move_layer(current, current - 1));
            }
        });

        let Some(layer) = self.project.layer(current) else {
            return;
        };
        let mut opacity = layer.opacity();
        let original_blend_mode = layer.blend_mode;
        let mut blend_mode = original_blend_mode;
        if ui
            .add(egui::Slider::new(&mut opacity, 0.0..=1.0).text("Opacity"))
            .changed()
        {
            log_error(self.project.set_layer_opacity(current, opacity));
        }
        egui::ComboBox::from_id_salt("blend_mode")
            .selected_text(blend_mode.name())
            .show_ui(ui, |ui| {
                for mode in BlendMode::ALL {
                    ui.selectable_value(&mut blend_mode, mode, mode.name());
                }
            });
        if blend_mode != original_blend_mode {
            log_error(self.project.set_layer_blend_mode(current, blend_mode));
        }
    }

    fn frames_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("Frames");
        let current = self.project.current_frame();
        let count = self.project.frame_count();
        ui.horizontal(|ui| {
            if ui.button("◀").clicked() && current > 0 {
                log_error(self.project.set_current_frame(current - 1));
            }
            ui.label(format!("{} / {}", current + 1, count));
            if ui.button("▶").clicked() && current + 1 < count {
                log_error(self.project.set_current_frame(current + 1));
            }
        });
        ui.horizontal(|ui| {
            if ui.button("Add").clicked() {
                self.project.add_frame();
            }
            if ui.button("Delete").clicked() {
                log_error(self.project.delete_frame(current));
            }
        });
    }

    fn resolution_section(&mut self, ui: &mut egui::Ui) {
        ui.heading("Canvas");
        ui.horizontal(|ui| {
            ui.add(egui::DragValue::new(&mut self.new_resolution.x).range(1..=MAX_RESOLUTION));
            ui.label("×");
            ui.add(egui::DragValue::new(&mut self.new_resolution.y).range(1..=MAX_RESOLUTION));
        });
        ui.horizontal(|ui| {
            if ui.button("Resize").clicked() {
                // Keep the old content centered
                let old = self.project.layer_resolution();
                let offset = PixelPosition::new(
                    (self.new_resolution.x as i32 - old.x as i32) / 2,
                    (self.new_resolution.y as i32 - old.y as i32) / 2,
                );
                log_error(self.project.resize_canvas(self.new_resolution, offset));
            }
            if ui.button("Scale").clicked() {
                log_error(self.project.scale_canvas(self.new_resolution));
            }
        });
    }

    fn canvas_panel(&mut self, ui: &mut egui::Ui) {
        let (rect, _) = ui.allocate_exact_size(ui.available_size(), Sense::click_and_drag());
        let pixels_per_point = ui.ctx().pixels_per_point();
        self.input.set_canvas_rect(rect, pixels_per_point);
        self.canvas
            .resize(rect.size() * pixels_per_point, &self.project, &self.settings);

        for event in self.input.process_input(ui.ctx()) {
            self.handle_event(event);
        }

        if let Err(err) = self.project.update_textures(&self.render) {
            log::error!("Failed to upload layer textures: {}", err);
        }
        self.canvas.sync(&self.project, &self.settings);
        if self.canvas.take_render_request() {
            self.draw_list = Arc::new(self.canvas.draw_list());
        }

        self.paint(ui, rect);
    }

    fn paint(&self, ui: &egui::Ui, rect: Rect) {
        let Some(renderer) = self.gl_renderer.clone() else {
            return;
        };
        let draw_list = self.draw_list.clone();
        let callback = egui::PaintCallback {
            rect,
            callback: Arc::new(egui_glow::CallbackFn::new(move |info, painter| {
                renderer.lock().paint(painter.gl(), painter, &draw_list, &info);
            })),
        };
        ui.painter().add(callback);
    }
}

impl eframe::App for MousetrapApp {
    /// Called by the frame work to save state before shutdown.
    fn save(&mut self, storage: &mut dyn eframe::Storage) {
        eframe::set_value(storage, SETTINGS_KEY, &self.settings);
    }

    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        egui::SidePanel::left("tools_panel")
            .resizable(false)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.tools_section(ui);
                    ui.separator();
                    self.view_section(ui);
                    ui.separator();
                    self.layers_section(ui);
                    ui.separator();
                    self.frames_section(ui);
                    ui.separator();
                    self.resolution_section(ui);
                });
            });

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| self.canvas_panel(ui));
    }

    fn on_exit(&mut self, gl: Option<&glow::Context>) {
        self.canvas.unrealize();
        if let (Some(gl), Some(renderer)) = (gl, &self.gl_renderer) {
            renderer.lock().destroy(gl);
        }
    }
}

fn log_error<T, E: std::fmt::Display>(result: Result<T, E>) {
    if let Err(err) = result {
        log::warn!("{}", err);
    }
}
