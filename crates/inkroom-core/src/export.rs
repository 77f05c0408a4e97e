//! Scene export: standalone SVG, rasterised PNG and a structural JSON snapshot.
//!
//! All three formats are produced from a [`Scene`] captured once at request
//! time, so remote edits arriving mid-export cannot tear the output.

use crate::camera::Camera;
use crate::document::DocumentSnapshot;
use crate::geometry::XYWH;
use crate::layer::{Color, Layer, LayerKind, PenPoint};
use crate::presence::{remote_drafts, ConnectionId};
use crate::room::Room;
use crate::stroke::{stroke_svg_path, StrokeOptions};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use thiserror::Error;

const MINOR_GRID: u32 = 20;
const MAJOR_GRID: u32 = 100;
const MAX_FONT_SIZE: f64 = 96.0;

/// Export errors.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Invalid SVG: {0}")]
    Svg(String),
    #[error("Cannot allocate a {width}x{height} image")]
    Raster { width: u32, height: u32 },
    #[error("PNG encoding failed: {0}")]
    Png(#[from] png::EncodingError),
    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    Svg,
    Png,
    Json,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 3] = [ExportFormat::Svg, ExportFormat::Png, ExportFormat::Json];

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Svg => "svg",
            ExportFormat::Png => "png",
            ExportFormat::Json => "json",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Svg => "image/svg+xml",
            ExportFormat::Png => "image/png",
            ExportFormat::Json => "application/json",
        }
    }
}

/// Appearance and size of exported scenes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    pub background: Color,
    /// Grid line color.
    pub border: Color,
    /// Viewport size in pixels.
    pub width: u32,
    pub height: u32,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            background: Color::new(254, 243, 199),
            border: Color::new(229, 231, 235),
            width: 1280,
            height: 800,
        }
    }
}

/// A pencil stroke in progress, drawn on top of the layers.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftStroke {
    pub connection_id: ConnectionId,
    pub points: Vec<PenPoint>,
    pub color: Color,
}

/// Everything needed to render the canvas as the local user sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub document: DocumentSnapshot,
    pub camera: Camera,
    pub drafts: Vec<DraftStroke>,
    pub stroke: StrokeOptions,
    pub options: ExportOptions,
}

impl Scene {
    /// Capture the room's current document and every connection's pencil draft.
    pub fn capture<R: Room + ?Sized>(
        room: &R,
        camera: Camera,
        stroke: StrokeOptions,
        options: ExportOptions,
    ) -> Self {
        let others = room.others();
        let mut drafts: Vec<DraftStroke> = remote_drafts(&others)
            .into_iter()
            .map(|draft| DraftStroke {
                connection_id: draft.connection_id,
                points: draft.points.to_vec(),
                color: draft.color,
            })
            .collect();
        let presence = room.presence();
        if let Some(points) = &presence.pencil_draft {
            drafts.push(DraftStroke {
                connection_id: room.connection_id(),
                points: points.clone(),
                color: presence.pen_color.unwrap_or(Color::BLACK),
            });
        }

        Self {
            document: room.snapshot(),
            camera,
            drafts,
            stroke,
            options,
        }
    }

    pub fn view_box(&self) -> String {
        format!("0 0 {} {}", self.options.width, self.options.height)
    }

    fn style(&self) -> String {
        format!("background-color: {}", self.options.background.to_css())
    }
}

/// A finished export, ready to be saved or downloaded.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub format: ExportFormat,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }
}

/// Render a scene in the given format. `name` is the file stem.
pub fn export(scene: &Scene, format: ExportFormat, name: &str) -> ExportResult<Artifact> {
    let bytes = match format {
        ExportFormat::Svg => to_svg(scene).into_bytes(),
        ExportFormat::Png => to_png(scene)?,
        ExportFormat::Json => serde_json::to_vec_pretty(&to_structural(scene))?,
    };
    log::info!("Exported {} layers as {} ({} bytes)", scene.document.len(), format.extension(), bytes.len());
    Ok(Artifact {
        format,
        file_name: format!("{name}.{}", format.extension()),
        bytes,
    })
}

/// Self-contained SVG document with colors inlined.
pub fn to_svg(scene: &Scene) -> String {
    let ExportOptions { width, height, .. } = scene.options;
    let mut svg = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"no\"?>\n");
    let _ = write!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"{}\" style=\"{}\">",
        scene.view_box(),
        scene.style(),
    );
    svg.push_str(&render_content(scene));
    svg.push_str("</svg>\n");
    svg
}

/// Rasterise the scene: background first, then the SVG on top.
pub fn to_png(scene: &Scene) -> ExportResult<Vec<u8>> {
    let ExportOptions { width, height, background, .. } = scene.options;

    let mut options = resvg::usvg::Options::default();
    options.fontdb_mut().load_system_fonts();
    let tree = resvg::usvg::Tree::from_str(&to_svg(scene), &options)
        .map_err(|e| ExportError::Svg(e.to_string()))?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or(ExportError::Raster { width, height })?;
    pixmap.fill(resvg::tiny_skia::Color::from_rgba8(background.r, background.g, background.b, 255));
    resvg::render(&tree, resvg::tiny_skia::Transform::identity(), &mut pixmap.as_mut());

    encode_png(pixmap.data(), width, height)
}

/// Encode straight RGBA8 pixels as PNG.
fn encode_png(rgba_data: &[u8], width: u32, height: u32) -> ExportResult<Vec<u8>> {
    let mut png_data = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut png_data, width, height);
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(rgba_data)?;
    }
    Ok(png_data)
}

/// Structural description of an exported scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralSnapshot {
    pub width: u32,
    pub height: u32,
    pub view_box: String,
    /// Union of all layer bounds, in canvas coordinates.
    pub bounds: Option<XYWH>,
    pub layer_count: usize,
    /// Inner SVG markup.
    pub content: String,
    pub style: String,
    pub css_variables: CssVariables,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CssVariables {
    pub color_border: String,
    pub background: String,
}

pub fn to_structural(scene: &Scene) -> StructuralSnapshot {
    StructuralSnapshot {
        width: scene.options.width,
        height: scene.options.height,
        view_box: scene.view_box(),
        bounds: scene.document.bounds(),
        layer_count: scene.document.len(),
        content: render_content(scene),
        style: scene.style(),
        css_variables: CssVariables {
            color_border: scene.options.border.to_css(),
            background: scene.options.background.to_css(),
        },
    }
}

fn render_content(scene: &Scene) -> String {
    let border = scene.options.border.to_css();
    let mut out = String::new();
    let _ = write!(
        out,
        "<defs>\
         <pattern id=\"minorGrid\" width=\"{MINOR_GRID}\" height=\"{MINOR_GRID}\" patternUnits=\"userSpaceOnUse\">\
         <path d=\"M {MINOR_GRID} 0 L 0 0 0 {MINOR_GRID}\" fill=\"none\" stroke=\"{border}\" stroke-width=\"0.5\"/>\
         </pattern>\
         <pattern id=\"majorGrid\" width=\"{MAJOR_GRID}\" height=\"{MAJOR_GRID}\" patternUnits=\"userSpaceOnUse\">\
         <rect width=\"{MAJOR_GRID}\" height=\"{MAJOR_GRID}\" fill=\"url(#minorGrid)\"/>\
         <path d=\"M {MAJOR_GRID} 0 L 0 0 0 {MAJOR_GRID}\" fill=\"none\" stroke=\"{border}\" stroke-width=\"1\"/>\
         </pattern>\
         </defs>\
         <rect width=\"100%\" height=\"100%\" fill=\"url(#majorGrid)\"/>"
    );
    let _ = write!(out, "<g transform=\"translate({} {})\">", scene.camera.x, scene.camera.y);
    for (id, layer) in scene.document.ordered() {
        render_layer(&mut out, id.as_str(), layer, &scene.stroke);
    }
    for draft in &scene.drafts {
        if draft.points.is_empty() {
            continue;
        }
        let _ = write!(
            out,
            "<path d=\"{}\" fill=\"{}\"/>",
            stroke_svg_path(&draft.points, &scene.stroke),
            draft.color.to_css()
        );
    }
    out.push_str("</g>");
    out
}

fn render_layer(out: &mut String, id: &str, layer: &Layer, stroke: &StrokeOptions) {
    let Layer { x, y, width, height, fill, .. } = *layer;
    let fill_css = fill.to_css();
    match &layer.kind {
        LayerKind::Rectangle => {
            let _ = write!(
                out,
                "<rect data-id=\"{id}\" x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" fill=\"{fill_css}\"/>"
            );
        }
        LayerKind::Ellipse => {
            let _ = write!(
                out,
                "<ellipse data-id=\"{id}\" cx=\"{}\" cy=\"{}\" rx=\"{}\" ry=\"{}\" fill=\"{fill_css}\"/>",
                x + width / 2.0,
                y + height / 2.0,
                width / 2.0,
                height / 2.0
            );
        }
        LayerKind::Text { value } => {
            let _ = write!(out, "<g data-id=\"{id}\">");
            render_text(out, layer.bounds(), value.as_deref(), fill);
            out.push_str("</g>");
        }
        LayerKind::Note { value } => {
            let _ = write!(
                out,
                "<g data-id=\"{id}\"><rect x=\"{x}\" y=\"{y}\" width=\"{width}\" height=\"{height}\" fill=\"{fill_css}\"/>"
            );
            render_text(out, layer.bounds(), value.as_deref(), fill.contrasting_text());
            out.push_str("</g>");
        }
        LayerKind::Path { points, stroke: outline } => {
            let stroke_attr = outline
                .map(|color| format!(" stroke=\"{}\"", color.to_css()))
                .unwrap_or_default();
            let _ = write!(
                out,
                "<path data-id=\"{id}\" transform=\"translate({x} {y})\" d=\"{}\" fill=\"{fill_css}\"{stroke_attr}/>",
                stroke_svg_path(points, stroke)
            );
        }
    }
}

fn render_text(out: &mut String, bounds: XYWH, value: Option<&str>, color: Color) {
    let font_size = (bounds.height * 0.5).min(bounds.width * 0.5).min(MAX_FONT_SIZE);
    let _ = write!(
        out,
        "<text x=\"{}\" y=\"{}\" font-size=\"{font_size}\" text-anchor=\"middle\" dominant-baseline=\"middle\" fill=\"{}\">{}</text>",
        bounds.x + bounds.width / 2.0,
        bounds.y + bounds.height / 2.0,
        color.to_css(),
        escape_xml(value.unwrap_or("Text"))
    );
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
