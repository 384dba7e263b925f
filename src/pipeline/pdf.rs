//! PDF writer for laid-out pages.
//!
//! Emits a PDF 1.5 file with `lopdf`. Text uses the standard Type1 fonts in
//! WinAnsiEncoding, so nothing is embedded except raster images. Output is
//! byte-for-byte deterministic for the same pages: no timestamps, no IDs,
//! objects numbered in drawing order.

use crate::config::PageGeometry;
use crate::error::Md2PdfError;
use crate::model::{Color, FontFace};
use crate::pipeline::metrics::encode_winansi;
use crate::pipeline::paginate::{DrawOp, Page};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Value of the `/Producer` info entry.
pub const PRODUCER: &str = concat!("md2pdf ", env!("CARGO_PKG_VERSION"));

/// A decoded raster image split into colour and alpha planes.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    /// `width * height * 3` bytes of RGB.
    pub rgb: Vec<u8>,
    /// `width * height` bytes of alpha; None when fully opaque.
    pub alpha: Option<Vec<u8>>,
}

/// Decode an image file to RGB plus optional alpha.
pub fn decode_image(path: &Path) -> Result<DecodedImage, image::ImageError> {
    let rgba = image::open(path)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixels = (width as usize) * (height as usize);

    let mut rgb = Vec::with_capacity(pixels * 3);
    let mut alpha = Vec::with_capacity(pixels);
    let mut transparent = false;
    for pixel in rgba.pixels() {
        rgb.extend_from_slice(&pixel.0[..3]);
        alpha.push(pixel[3]);
        transparent |= pixel[3] != 255;
    }

    Ok(DecodedImage {
        width,
        height,
        rgb,
        alpha: transparent.then_some(alpha),
    })
}

/// Serialise `pages` to PDF bytes.
pub fn write_pdf(
    pages: &[Page],
    geometry: PageGeometry,
    title: Option<&str>,
) -> Result<Vec<u8>, Md2PdfError> {
    let mut writer = PdfWriter::new();
    writer.embed_images(pages);
    writer.add_pages(pages, geometry)?;
    writer.finish(title)
}

struct PdfWriter {
    doc: Document,
    pages_id: ObjectId,
    /// Embedded images by path, with their resource names. `None` marks a
    /// path that could not be decoded.
    images: HashMap<PathBuf, Option<String>>,
    xobjects: Dictionary,
    kids: Vec<Object>,
}

impl PdfWriter {
    fn new() -> Self {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        Self {
            doc,
            pages_id,
            images: HashMap::new(),
            xobjects: Dictionary::new(),
            kids: Vec::new(),
        }
    }

    // ── Images ───────────────────────────────────────────────────────────

    fn embed_images(&mut self, pages: &[Page]) {
        for op in pages.iter().flat_map(|p| p.ops.iter()) {
            let DrawOp::Image { path, .. } = op else {
                continue;
            };
            if self.images.contains_key(path) {
                continue;
            }
            let name = match decode_image(path) {
                Ok(image) => {
                    let name = format!("Im{}", self.xobjects.len() + 1);
                    let id = self.add_image(image);
                    self.xobjects.set(name.clone(), id);
                    debug!("Embedded {} as /{}", path.display(), name);
                    Some(name)
                }
                Err(e) => {
                    warn!("Cannot embed image {}: {}", path.display(), e);
                    None
                }
            };
            self.images.insert(path.clone(), name);
        }
    }

    fn add_image(&mut self, image: DecodedImage) -> ObjectId {
        let mut dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(image.width),
            "Height" => i64::from(image.height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };
        if let Some(alpha) = image.alpha {
            let smask = Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(image.width),
                    "Height" => i64::from(image.height),
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                alpha,
            );
            let smask_id = self.doc.add_object(smask);
            dict.set("SMask", smask_id);
        }
        self.doc.add_object(Stream::new(dict, image.rgb))
    }

    // ── Pages ────────────────────────────────────────────────────────────

    fn add_pages(&mut self, pages: &[Page], geometry: PageGeometry) -> Result<(), Md2PdfError> {
        for page in pages {
            let mut operations = Vec::with_capacity(page.ops.len() * 4);
            let mut annotations = Vec::new();
            for op in &page.ops {
                self.draw(op, &mut operations, &mut annotations);
            }

            let content = Content { operations }
                .encode()
                .map_err(|e| Md2PdfError::LayoutFailed(format!("content stream: {e}")))?;
            let content_id = self.doc.add_object(Stream::new(dictionary! {}, content));

            let mut page_dict = dictionary! {
                "Type" => "Page",
                "Parent" => self.pages_id,
                "Contents" => content_id,
            };
            if !annotations.is_empty() {
                let ids: Vec<Object> = annotations
                    .into_iter()
                    .map(|a| self.doc.add_object(a).into())
                    .collect();
                page_dict.set("Annots", ids);
            }
            let page_id = self.doc.add_object(page_dict);
            self.kids.push(page_id.into());
        }

        let mut fonts = Dictionary::new();
        for face in FontFace::ALL {
            let font_id = self.doc.add_object(dictionary! {
                "Type" => "Font",
                "Subtype" => "Type1",
                "BaseFont" => face.base_name(),
                "Encoding" => "WinAnsiEncoding",
            });
            fonts.set(face.resource_name(), font_id);
        }
        let mut resources = dictionary! { "Font" => fonts };
        if !self.xobjects.is_empty() {
            resources.set("XObject", std::mem::take(&mut self.xobjects));
        }
        let resources_id = self.doc.add_object(resources);

        let count = self.kids.len() as i64;
        let pages_dict = dictionary! {
            "Type" => "Pages",
            "Kids" => std::mem::take(&mut self.kids),
            "Count" => count,
            "MediaBox" => vec![0.into(), 0.into(), real(geometry.width), real(geometry.height)],
            "Resources" => resources_id,
        };
        self.doc
            .objects
            .insert(self.pages_id, Object::Dictionary(pages_dict));
        Ok(())
    }

    fn draw(&self, op: &DrawOp, out: &mut Vec<Operation>, annotations: &mut Vec<Dictionary>) {
        match op {
            DrawOp::Text {
                x,
                y,
                font,
                size,
                color,
                text,
            } => {
                out.push(Operation::new("BT", vec![]));
                out.push(Operation::new(
                    "Tf",
                    vec![Object::Name(font.resource_name().into()), real(*size)],
                ));
                out.push(fill_color(*color));
                out.push(Operation::new("Td", vec![real(*x), real(*y)]));
                out.push(Operation::new(
                    "Tj",
                    vec![Object::String(encode_winansi(text), StringFormat::Literal)],
                ));
                out.push(Operation::new("ET", vec![]));
            }
            DrawOp::Rect {
                x,
                y,
                width,
                height,
                fill,
            } => {
                out.push(Operation::new("q", vec![]));
                out.push(fill_color(*fill));
                out.push(Operation::new(
                    "re",
                    vec![real(*x), real(*y), real(*width), real(*height)],
                ));
                out.push(Operation::new("f", vec![]));
                out.push(Operation::new("Q", vec![]));
            }
            DrawOp::Line {
                x1,
                y1,
                x2,
                y2,
                width,
                color,
            } => {
                let [r, g, b] = color.to_unit();
                out.push(Operation::new("q", vec![]));
                out.push(Operation::new("RG", vec![real(r), real(g), real(b)]));
                out.push(Operation::new("w", vec![real(*width)]));
                out.push(Operation::new("m", vec![real(*x1), real(*y1)]));
                out.push(Operation::new("l", vec![real(*x2), real(*y2)]));
                out.push(Operation::new("S", vec![]));
                out.push(Operation::new("Q", vec![]));
            }
            DrawOp::Image {
                x,
                y,
                width,
                height,
                path,
            } => match self.images.get(path).and_then(Option::as_ref) {
                Some(name) => {
                    out.push(Operation::new("q", vec![]));
                    out.push(Operation::new(
                        "cm",
                        vec![
                            real(*width),
                            0.into(),
                            0.into(),
                            real(*height),
                            real(*x),
                            real(*y),
                        ],
                    ));
                    out.push(Operation::new("Do", vec![Object::Name(name.as_bytes().to_vec())]));
                    out.push(Operation::new("Q", vec![]));
                }
                None => {
                    self.draw(
                        &DrawOp::Rect {
                            x: *x,
                            y: *y,
                            width: *width,
                            height: *height,
                            fill: Color::CODE_BACKGROUND,
                        },
                        out,
                        annotations,
                    );
                    self.draw(
                        &DrawOp::Text {
                            x: x + 6.0,
                            y: y + height - 14.0,
                            font: FontFace::HelveticaOblique,
                            size: 8.0,
                            color: Color::GREY,
                            text: format!("[Image unavailable: {}]", path.display()),
                        },
                        out,
                        annotations,
                    );
                }
            },
            DrawOp::Link {
                x,
                y,
                width,
                height,
                href,
            } => annotations.push(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Link",
                "Rect" => vec![real(*x), real(*y), real(x + width), real(y + height)],
                "Border" => vec![0.into(), 0.into(), 0.into()],
                "A" => dictionary! {
                    "S" => "URI",
                    "URI" => Object::string_literal(href.as_bytes().to_vec()),
                },
            }),
        }
    }

    fn finish(mut self, title: Option<&str>) -> Result<Vec<u8>, Md2PdfError> {
        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        let mut info = dictionary! {
            "Producer" => Object::string_literal(PRODUCER),
        };
        if let Some(title) = title {
            info.set(
                "Title",
                Object::String(encode_winansi(title), StringFormat::Literal),
            );
        }
        let info_id = self.doc.add_object(info);
        self.doc.trailer.set("Root", catalog_id);
        self.doc.trailer.set("Info", info_id);

        self.doc.compress();
        let mut bytes = Vec::new();
        self.doc
            .save_to(&mut bytes)
            .map_err(|e| Md2PdfError::LayoutFailed(format!("serialise: {e}")))?;
        Ok(bytes)
    }
}

/// Round to hundredths of a point so content streams stay compact.
fn real(value: f32) -> Object {
    Object::Real((value * 100.0).round() / 100.0)
}

fn fill_color(color: Color) -> Operation {
    let [r, g, b] = color.to_unit();
    Operation::new("rg", vec![real(r), real(g), real(b)])
}
