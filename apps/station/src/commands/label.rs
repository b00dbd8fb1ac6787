//! # Label Commands
//!
//! Renders Agri-ID labels: a QR symbol (error correction H) of the
//! `AGRI-v1` payload inside a dashed card captioned with the farmer's name
//! and identifier.
//!
//! ## Card Layout
//! ```text
//! ┌ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ┐   size_px (default 200)
//!        ▄▄▄▄▄▄▄▄▄▄▄▄
//! │      █ QR symbol █      │   >= 120 px, quiet zone included
//!        ▀▀▀▀▀▀▀▀▀▀▀▀
//! │        Jane Doe         │
//!            F001
//! └ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ─ ┘
//! ```
//!
//! The card grows when a long payload needs a larger symbol.

use qrcode::render::{svg, unicode};
use qrcode::{EcLevel, QrCode};
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use agri_core::{label, FarmerRecord};

use crate::error::{ApiError, ApiResult};
use crate::state::DbState;

/// Smallest rendered symbol side, quiet zone included.
pub const QR_MIN_PX: u32 = 120;

/// Quiet zone width in modules for a normal QR symbol.
const QUIET_ZONE_MODULES: u32 = 4;

const CARD_PADDING: u32 = 16;
const CAPTION_HEIGHT: u32 = 48;

/// A rendered label.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelDto {
    pub id: String,
    pub name: String,
    pub payload: String,
    /// Where the SVG card was written, if anywhere.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
    /// Terminal rendering of the symbol.
    #[serde(skip)]
    pub preview: String,
}

/// Result of `print`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintReport {
    pub directory: PathBuf,
    pub labels: Vec<PrintedLabel>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintedLabel {
    pub id: String,
    pub file: PathBuf,
}

impl fmt::Display for LabelDto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.preview)?;
        writeln!(f, "{} ({})", self.name, self.id)?;
        write!(f, "{}", self.payload)?;
        if let Some(file) = &self.file {
            write!(f, "\nwritten to {}", file.display())?;
        }
        Ok(())
    }
}

impl fmt::Display for PrintReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} label(s) in {}",
            self.labels.len(),
            self.directory.display()
        )?;
        for printed in &self.labels {
            write!(f, "\n  {:<10} {}", printed.id, printed.file.display())?;
        }
        Ok(())
    }
}

// =============================================================================
// Rendering
// =============================================================================

/// Encodes the farmer's label payload as a level-H symbol.
pub fn qr_code(record: &FarmerRecord) -> ApiResult<QrCode> {
    let payload = label::encode(record);
    QrCode::with_error_correction_level(payload.as_bytes(), EcLevel::H).map_err(|e| {
        ApiError::validation(format!("Label for '{}' cannot be encoded: {}", record.id, e))
    })
}

/// Renders the printable SVG card.
pub fn render_svg(record: &FarmerRecord, size_px: u32) -> ApiResult<String> {
    let code = qr_code(record)?;

    let modules = code.width() as u32 + 2 * QUIET_ZONE_MODULES;
    let unit = QR_MIN_PX.div_ceil(modules);
    let side = unit * modules;

    let symbol = code
        .render::<svg::Color>()
        .quiet_zone(true)
        .module_dimensions(unit, unit)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#ffffff"))
        .build();
    // Nested <svg> cannot carry an XML declaration
    let symbol = match symbol.find("?>") {
        Some(end) if symbol.starts_with("<?xml") => &symbol[end + 2..],
        _ => symbol.as_str(),
    };

    let width = size_px.max(side + 2 * CARD_PADDING);
    let height = size_px.max(side + CARD_PADDING + CAPTION_HEIGHT);
    let x = (width - side) / 2;
    let name_y = CARD_PADDING + side + 20;
    let id_y = name_y + 18;

    debug!(id = %record.id, side, width, height, "Rendering label card");

    Ok(format!(
        concat!(
            r##"<?xml version="1.0" encoding="UTF-8"?>"##,
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"##,
            r##"<rect x="1" y="1" width="{rw}" height="{rh}" rx="8" fill="#ffffff" stroke="#555555" stroke-width="2" stroke-dasharray="6 4"/>"##,
            r##"<g transform="translate({x} {y})">{symbol}</g>"##,
            r##"<text x="{cx}" y="{name_y}" text-anchor="middle" font-family="sans-serif" font-size="14" font-weight="bold">{name}</text>"##,
            r##"<text x="{cx}" y="{id_y}" text-anchor="middle" font-family="monospace" font-size="12">{id}</text>"##,
            "</svg>\n"
        ),
        w = width,
        h = height,
        rw = width - 2,
        rh = height - 2,
        x = x,
        y = CARD_PADDING,
        symbol = symbol,
        cx = width / 2,
        name_y = name_y,
        id_y = id_y,
        name = escape_xml(&record.name),
        id = escape_xml(&record.id),
    ))
}

/// Renders the symbol with half-block characters for a terminal.
pub fn render_terminal(record: &FarmerRecord) -> ApiResult<String> {
    let code = qr_code(record)?;
    Ok(code
        .render::<unicode::Dense1x2>()
        .dark_color(unicode::Dense1x2::Light)
        .light_color(unicode::Dense1x2::Dark)
        .quiet_zone(true)
        .build())
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// File name for a farmer's card. Characters outside `[A-Za-z0-9._-]`
/// become `_`.
///
/// Names already in `taken` (compared case-insensitively) get a `-2`, `-3`
/// ... suffix, so ids like `F 1` and `F_1` never share a file.
pub fn label_file_name(id: &str, taken: &mut HashSet<String>) -> String {
    let stem: String = id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let mut name = format!("{}.svg", stem);
    let mut suffix = 2;
    while !taken.insert(name.to_lowercase()) {
        name = format!("{}-{}.svg", stem, suffix);
        suffix += 1;
    }
    name
}

// =============================================================================
// Commands
// =============================================================================

/// Renders one farmer's label, optionally writing the SVG card to `out`.
pub async fn label_farmer(
    db: &DbState,
    id: &str,
    out: Option<&Path>,
    size_px: u32,
) -> ApiResult<LabelDto> {
    debug!(id = %id, "label_farmer command");

    let record = db
        .inner()
        .farmers()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Farmer", id))?;

    let preview = render_terminal(&record)?;
    let file = match out {
        Some(path) => {
            let svg = render_svg(&record, size_px)?;
            tokio::fs::write(path, svg)
                .await
                .map_err(|e| ApiError::io("Failed to write label", e))?;
            info!(id = %record.id, path = ?path, "Label written");
            Some(path.to_path_buf())
        }
        None => None,
    };

    Ok(LabelDto {
        payload: label::encode(&record),
        id: record.id,
        name: record.name,
        file,
        preview,
    })
}

/// Writes one SVG card per registered farmer into `out_dir`.
pub async fn print_labels(db: &DbState, out_dir: &Path, size_px: u32) -> ApiResult<PrintReport> {
    let farmers = db.inner().farmers().list().await?;
    debug!(count = farmers.len(), dir = ?out_dir, "print_labels command");

    tokio::fs::create_dir_all(out_dir)
        .await
        .map_err(|e| ApiError::io("Failed to create label directory", e))?;

    let mut labels = Vec::with_capacity(farmers.len());
    let mut taken = HashSet::new();
    for record in &farmers {
        let file = out_dir.join(label_file_name(&record.id, &mut taken));
        let svg = render_svg(record, size_px)?;
        tokio::fs::write(&file, svg)
            .await
            .map_err(|e| ApiError::io("Failed to write label", e))?;
        labels.push(PrintedLabel {
            id: record.id.clone(),
            file,
        });
    }

    info!(count = labels.len(), dir = ?out_dir, "Labels printed");
    Ok(PrintReport {
        directory: out_dir.to_path_buf(),
        labels,
    })
}
