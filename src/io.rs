//! Reading and writing frames.
//!
//! Raster formats go through `image`. SVG is written by hand as one
//! `<rect>` per pixel and is export only; reading it back is limited to the
//! declared size. The native `.spryte` project keeps every frame
//! losslessly: a 12 byte header followed by lz-string compressed JSON.
//!
//! Saving always encodes every output in memory first, so a failing
//! encoder never leaves a half-written file behind.

use crate::error::Result;
use crate::pixelmap::PixelMap;
use crate::{Color, SpryteError};
use image::codecs::gif::{GifDecoder, GifEncoder, Repeat};
use image::codecs::png::PngEncoder;
use image::{AnimationDecoder, ColorType, Delay, Frame, ImageBuffer, ImageEncoder, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const FRAME_DELAY_MS: u32 = 250;
pub const SVG_PIXEL_SIZE: f64 = 20.0;
/// Outward bleed of every SVG rect, hides hairline seams between cells.
pub const SVG_MARGIN: f64 = 0.05;

pub const PROJECT_MAGIC: &[u8; 4] = b"SPRY";
pub const PROJECT_HEADER_LEN: usize = 12;
const PROJECT_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Png,
    Gif,
    Svg,
    Project,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "png" => Some(FileFormat::Png),
            "gif" => Some(FileFormat::Gif),
            "svg" => Some(FileFormat::Svg),
            "spryte" => Some(FileFormat::Project),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            FileFormat::Png => "png",
            FileFormat::Gif => "gif",
            FileFormat::Svg => "svg",
            FileFormat::Project => "spryte",
        }
    }

    /// Formats that store every frame in a single file.
    pub fn is_multi_frame(&self) -> bool {
        matches!(self, FileFormat::Gif | FileFormat::Project)
    }
}

/// An encoded output waiting to be written.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedFile {
    pub path: PathBuf,
    pub bytes: Vec<u8>,
}

pub fn pixelmap_to_image(pixelmap: &PixelMap) -> RgbaImage {
    ImageBuffer::from_fn(pixelmap.width(), pixelmap.height(), |x, y| {
        Rgba(pixelmap.get(x as i32 + 1, y as i32 + 1).to_rgba8())
    })
}

pub fn image_to_pixelmap(image: &RgbaImage) -> PixelMap {
    PixelMap::from_rgba(image.width(), image.height(), image.as_raw())
}

pub fn encode_png(pixelmap: &PixelMap) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        &pixelmap.to_rgba(),
        pixelmap.width(),
        pixelmap.height(),
        ColorType::Rgba8,
    )?;
    Ok(bytes)
}

/// Decodes any raster format `image` recognises into a single frame.
pub fn decode_raster(bytes: &[u8]) -> Result<PixelMap> {
    let image = image::load_from_memory(bytes)?.to_rgba8();
    Ok(image_to_pixelmap(&image))
}

pub fn encode_gif(frames: &[PixelMap], delay_ms: u32) -> Result<Vec<u8>> {
    if frames.is_empty() {
        return Err(SpryteError::NoFrames);
    }

    let mut bytes = Vec::new();
    {
        // The trailer is written when the encoder drops
        let mut encoder = GifEncoder::new(&mut bytes);
        encoder.set_repeat(Repeat::Infinite)?;

        for pixelmap in frames {
            let delay = Delay::from_numer_denom_ms(delay_ms, 1);
            encoder.encode_frame(Frame::from_parts(pixelmap_to_image(pixelmap), 0, 0, delay))?;
        }
    }
    Ok(bytes)
}

pub fn decode_gif(bytes: &[u8]) -> Result<Vec<PixelMap>> {
    let decoder = GifDecoder::new(Cursor::new(bytes))?;
    let frames = decoder.into_frames().collect_frames()?;

    Ok(frames
        .into_iter()
        .map(|frame| image_to_pixelmap(frame.buffer()))
        .collect())
}

pub fn pixelmap_to_svg(pixelmap: &PixelMap) -> String {
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg width="{}" height="{}" xmlns="http://www.w3.org/2000/svg">"#,
        pixelmap.width() as f64 * SVG_PIXEL_SIZE,
        pixelmap.height() as f64 * SVG_PIXEL_SIZE,
    );

    let size = SVG_PIXEL_SIZE + SVG_MARGIN * 2.0;
    for ((x, y), color) in pixelmap.sorted_pixels() {
        let [r, g, b] = color.to_rgb8();
        let _ = writeln!(
            svg,
            r#"  <rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" style="fill:rgb({},{},{})" fill-opacity="{}" />"#,
            (x - 1) as f64 * SVG_PIXEL_SIZE - SVG_MARGIN,
            (y - 1) as f64 * SVG_PIXEL_SIZE - SVG_MARGIN,
            size,
            size,
            r,
            g,
            b,
            color.a,
        );
    }

    svg.push_str("</svg>\n");
    svg
}

/// Value of `name="..."` inside a single tag, ignoring attributes that
/// merely end with `name` such as `stroke-width`.
fn attribute<'a>(tag: &'a str, name: &str) -> Option<&'a str> {
    let needle = format!("{name}=\"");
    for (index, _) in tag.match_indices(&needle) {
        let boundary = tag[..index]
            .chars()
            .next_back()
            .map_or(true, |c| c.is_whitespace());
        if !boundary {
            continue;
        }

        let rest = &tag[index + needle.len()..];
        return rest.find('"').map(|end| &rest[..end]);
    }
    None
}

/// The `<svg ...>` opening tag, without its closing bracket.
fn svg_root_tag(text: &str) -> Option<&str> {
    let tag = &text[text.find("<svg")?..];
    tag.find('>').map(|end| &tag[..end])
}

/// Layout size declared by an SVG document, in cells.
///
/// This is a text scan of the root tag, not a parser. Anything it cannot
/// make sense of yields one cell on that axis.
pub fn svg_dimensions(text: &str) -> (u32, u32) {
    let Some(tag) = svg_root_tag(text) else {
        return (1, 1);
    };

    let cells = |name: &str| {
        attribute(tag, name)
            .and_then(|value| value.trim().trim_end_matches("px").parse::<f64>().ok())
            .filter(|value| value.is_finite() && *value > 0.0)
            .map_or(1, |value| ((value / SVG_PIXEL_SIZE) as u32).max(1))
    };

    (cells("width"), cells("height"))
}

#[derive(Debug, Serialize, Deserialize)]
struct ProjectBody {
    version: u32,
    frames: Vec<ProjectFrame>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProjectFrame {
    pixels: Vec<ProjectPixel>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProjectPixel {
    x: i32,
    y: i32,
    color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProjectHeader {
    pub magic: [u8; 4],
    pub width: u16,
    pub height: u16,
    pub reserved: [u8; 4],
}

impl ProjectHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < PROJECT_HEADER_LEN {
            return Err(SpryteError::Project("file too short".to_string()));
        }

        let header = ProjectHeader {
            magic: [data[0], data[1], data[2], data[3]],
            width: u16::from_le_bytes([data[4], data[5]]),
            height: u16::from_le_bytes([data[6], data[7]]),
            reserved: [data[8], data[9], data[10], data[11]],
        };

        if &header.magic != PROJECT_MAGIC {
            return Err(SpryteError::Project("bad magic".to_string()));
        }
        if header.width == 0 || header.height == 0 {
            return Err(SpryteError::Project(format!(
                "empty layout {}x{}",
                header.width, header.height
            )));
        }
        Ok(header)
    }

    fn to_bytes(self) -> [u8; PROJECT_HEADER_LEN] {
        let mut bytes = [0u8; PROJECT_HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4..6].copy_from_slice(&self.width.to_le_bytes());
        bytes[6..8].copy_from_slice(&self.height.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.reserved);
        bytes
    }
}

pub fn encode_project(frames: &[PixelMap]) -> Result<Vec<u8>> {
    let first = frames.first().ok_or(SpryteError::NoFrames)?;
    let too_large = || SpryteError::Project(format!("layout {}x{} too large", first.width(), first.height()));
    let header = ProjectHeader {
        magic: *PROJECT_MAGIC,
        width: u16::try_from(first.width()).map_err(|_| too_large())?,
        height: u16::try_from(first.height()).map_err(|_| too_large())?,
        reserved: [0; 4],
    };

    let body = ProjectBody {
        version: PROJECT_VERSION,
        frames: frames
            .iter()
            .map(|pixelmap| ProjectFrame {
                pixels: pixelmap
                    .sorted_pixels()
                    .into_iter()
                    .map(|((x, y), color)| ProjectPixel { x, y, color })
                    .collect(),
            })
            .collect(),
    };
    let json = serde_json::to_string(&body)?;

    let mut bytes = header.to_bytes().to_vec();
    bytes.extend(lz_str::compress_to_uint8_array(json.as_str()));
    Ok(bytes)
}

pub fn decode_project(data: &[u8]) -> Result<Vec<PixelMap>> {
    let header = ProjectHeader::parse(data)?;

    let decompressed = lz_str::decompress_from_uint8_array(&data[PROJECT_HEADER_LEN..])
        .ok_or_else(|| SpryteError::Project("failed to decompress body".to_string()))?;
    let json = String::from_utf16(&decompressed)
        .map_err(|e| SpryteError::Project(format!("body is not text: {e}")))?;
    let body: ProjectBody = serde_json::from_str(&json)?;

    if body.version > PROJECT_VERSION {
        return Err(SpryteError::Project(format!("unsupported version {}", body.version)));
    }
    if body.frames.is_empty() {
        return Err(SpryteError::NoFrames);
    }

    let (width, height) = (header.width as u32, header.height as u32);
    Ok(body
        .frames
        .into_iter()
        .map(|frame| {
            let mut pixelmap = PixelMap::new(width, height);
            for pixel in frame.pixels {
                pixelmap.set(pixel.x, pixel.y, pixel.color);
            }
            pixelmap
        })
        .collect())
}

/// `dir/name.ext` becomes `dir/name {index}.ext`.
fn numbered_path(path: &Path, index: usize) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{stem} {index}.{extension}"))
}

/// Encodes frames for `path` without touching the filesystem.
///
/// Single frame formats given several frames produce one numbered file
/// per frame. An unknown extension falls back to PNG with `.png`
/// appended to the name.
pub fn encode(frames: &[PixelMap], path: &Path, delay_ms: u32) -> Result<Vec<EncodedFile>> {
    if frames.is_empty() {
        return Err(SpryteError::NoFrames);
    }

    let (format, path) = match FileFormat::from_path(path) {
        Some(format) => (format, path.to_path_buf()),
        None => {
            let mut fallback = path.as_os_str().to_owned();
            fallback.push(".png");
            let fallback = PathBuf::from(fallback);
            warn!(
                path = %path.display(),
                fallback = %fallback.display(),
                "unsupported format, saving as png"
            );
            (FileFormat::Png, fallback)
        }
    };

    let single = |pixelmap: &PixelMap| -> Result<Vec<u8>> {
        match format {
            FileFormat::Svg => Ok(pixelmap_to_svg(pixelmap).into_bytes()),
            _ => encode_png(pixelmap),
        }
    };

    let files = match format {
        FileFormat::Gif => vec![EncodedFile {
            bytes: encode_gif(frames, delay_ms)?,
            path,
        }],
        FileFormat::Project => vec![EncodedFile {
            bytes: encode_project(frames)?,
            path,
        }],
        FileFormat::Png | FileFormat::Svg if frames.len() == 1 => vec![EncodedFile {
            bytes: single(&frames[0])?,
            path,
        }],
        FileFormat::Png | FileFormat::Svg => frames
            .iter()
            .enumerate()
            .map(|(index, pixelmap)| {
                Ok(EncodedFile {
                    bytes: single(pixelmap)?,
                    path: numbered_path(&path, index),
                })
            })
            .collect::<Result<Vec<_>>>()?,
    };

    debug!(format = format.extension(), files = files.len(), "encoded frames");
    Ok(files)
}

pub fn write_all(files: &[EncodedFile]) -> Result<()> {
    for file in files {
        fs::write(&file.path, &file.bytes)?;
        info!(path = %file.path.display(), bytes = file.bytes.len(), "wrote file");
    }
    Ok(())
}

/// Encodes then writes. Returns the paths actually written.
pub fn save(frames: &[PixelMap], path: &Path, delay_ms: u32) -> Result<Vec<PathBuf>> {
    let files = encode(frames, path, delay_ms)?;
    write_all(&files)?;
    Ok(files.into_iter().map(|file| file.path).collect())
}

pub fn open(path: &Path) -> Result<Vec<PixelMap>> {
    let format =
        FileFormat::from_path(path).ok_or_else(|| SpryteError::UnsupportedFormat(path.to_path_buf()))?;

    let frames = match format {
        FileFormat::Png => vec![decode_raster(&fs::read(path)?)?],
        FileFormat::Gif => decode_gif(&fs::read(path)?)?,
        FileFormat::Svg => return Err(SpryteError::WriteOnly(path.to_path_buf())),
        FileFormat::Project => decode_project(&fs::read(path)?)?,
    };

    if frames.is_empty() {
        return Err(SpryteError::NoFrames);
    }
    info!(path = %path.display(), frames = frames.len(), "opened file");
    Ok(frames)
}

/// Best-effort size of an image file in cells. Never fails; unreadable
/// input reports a single cell.
pub fn probe_dimensions(path: &Path) -> (u32, u32) {
    if let Ok(size) = image::image_dimensions(path) {
        return size;
    }

    match FileFormat::from_path(path) {
        Some(FileFormat::Project) => fs::read(path)
            .ok()
            .and_then(|data| ProjectHeader::parse(&data).ok())
            .map_or((1, 1), |header| (header.width as u32, header.height as u32)),
        _ => fs::read_to_string(path).map_or((1, 1), |text| svg_dimensions(&text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::new(1.0, 0.0, 0.0, 1.0);
    const HALF_BLUE: Color = Color::new(0.0, 0.0, 1.0, 0.5);

    fn sample(width: u32, height: u32) -> PixelMap {
        let mut pixelmap = PixelMap::new(width, height);
        pixelmap.set(1, 1, RED);
        pixelmap.set(width as i32, height as i32, Color::BLACK);
        pixelmap.set(2, 1, Color::from_rgba8([10, 200, 30, 255]));
        pixelmap
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(FileFormat::from_path(Path::new("a.PNG")), Some(FileFormat::Png));
        assert_eq!(FileFormat::from_path(Path::new("dir/a.gif")), Some(FileFormat::Gif));
        assert_eq!(FileFormat::from_path(Path::new("a.spryte")), Some(FileFormat::Project));
        assert_eq!(FileFormat::from_path(Path::new("a.bmp")), None);
        assert_eq!(FileFormat::from_path(Path::new("noext")), None);
    }

    #[test]
    fn test_image_is_dense_and_transparent_where_absent() {
        let image = pixelmap_to_image(&sample(4, 3));
        assert_eq!(image.dimensions(), (4, 3));
        assert_eq!(image.get_pixel(0, 0).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(3, 2).0, [0, 0, 0, 255]);
        assert_eq!(image.get_pixel(1, 1).0, [0, 0, 0, 0]);
    }

    #[test]
    fn test_png_round_trip() {
        let mut pixelmap = sample(5, 4);
        pixelmap.set(3, 3, Color::from_rgba8([0, 0, 255, 128]));

        let decoded = decode_raster(&encode_png(&pixelmap).unwrap()).unwrap();
        assert_eq!(decoded, pixelmap);
    }

    #[test]
    fn test_gif_round_trip_keeps_frames() {
        let first = sample(4, 4);
        let mut second = first.clone();
        second.set(2, 2, Color::WHITE);

        let bytes = encode_gif(&[first.clone(), second.clone()], FRAME_DELAY_MS).unwrap();
        let frames = decode_gif(&bytes).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], first);
        assert_eq!(frames[1], second);
    }

    #[test]
    fn test_svg_layout() {
        let mut pixelmap = PixelMap::new(3, 2);
        pixelmap.set(2, 1, HALF_BLUE);
        let svg = pixelmap_to_svg(&pixelmap);

        assert!(svg.starts_with(r#"<svg width="60" height="40""#));
        assert!(svg.contains(
            r#"<rect x="19.95" y="-0.05" width="20.10" height="20.10" style="fill:rgb(0,0,255)" fill-opacity="0.5" />"#
        ));
        assert_eq!(svg.matches("<rect").count(), 1);
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_svg_dimensions_best_effort() {
        assert_eq!(svg_dimensions(r#"<svg width="320" height="160">"#), (16, 8));
        assert_eq!(
            svg_dimensions("<?xml version=\"1.0\"?>\n<svg\n  height=\"40\"\n  width=\"100px\"\n>"),
            (5, 2)
        );
        assert_eq!(svg_dimensions(r#"<svg stroke-width="3" width="60">"#), (3, 1));
        assert_eq!(svg_dimensions(r#"<svg width="10" height="abc">"#), (1, 1));
        assert_eq!(svg_dimensions("not an svg at all"), (1, 1));
        assert_eq!(svg_dimensions(r#"<svg width=""#), (1, 1));
        assert_eq!(svg_dimensions(""), (1, 1));
        assert_eq!(svg_dimensions(r#"<svg width="1e300" height="-40">"#), (u32::MAX, 1));
    }

    #[test]
    fn test_project_round_trip_is_lossless() {
        let mut first = sample(7, 3);
        first.set(5, 2, Color::new(0.123456789, 0.5, 0.25, 0.3));
        let second = PixelMap::new(7, 3);

        let bytes = encode_project(&[first.clone(), second.clone()]).unwrap();
        assert_eq!(&bytes[0..4], PROJECT_MAGIC);
        assert_eq!(u16::from_le_bytes([bytes[4], bytes[5]]), 7);

        let frames = decode_project(&bytes).unwrap();
        assert_eq!(frames, vec![first, second]);
    }

    #[test]
    fn test_project_rejects_garbage() {
        assert!(matches!(decode_project(b"SPRY"), Err(SpryteError::Project(_))));
        assert!(matches!(
            decode_project(b"NEO \x01\x00\x01\x00\x00\x00\x00\x00"),
            Err(SpryteError::Project(_))
        ));
        assert!(encode_project(&[]).is_err());
        assert!(encode_project(&[PixelMap::new(70_000, 1)]).is_err());
    }

    #[test]
    fn test_encode_single_frame_formats_number_frames() {
        let frames = vec![sample(4, 4), sample(4, 4), sample(4, 4)];
        let files = encode(&frames, Path::new("out/sprite.png"), FRAME_DELAY_MS).unwrap();

        let paths: Vec<_> = files.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("out/sprite 0.png"),
                PathBuf::from("out/sprite 1.png"),
                PathBuf::from("out/sprite 2.png"),
            ]
        );

        let svg = encode(&frames[..1], Path::new("one.svg"), FRAME_DELAY_MS).unwrap();
        assert_eq!(svg.len(), 1);
        assert_eq!(svg[0].path, PathBuf::from("one.svg"));
    }

    #[test]
    fn test_encode_unknown_extension_falls_back_to_png() {
        let files = encode(&[sample(2, 2)], Path::new("sprite.bmp"), FRAME_DELAY_MS).unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, PathBuf::from("sprite.bmp.png"));
        assert_eq!(&files[0].bytes[1..4], b"PNG");
    }

    #[test]
    fn test_encode_requires_frames() {
        assert!(matches!(
            encode(&[], Path::new("a.gif"), FRAME_DELAY_MS),
            Err(SpryteError::NoFrames)
        ));
    }

    #[test]
    fn test_save_open_and_read_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        // GIF frames are composited over the previous one, so the later
        // frame only adds pixels
        let mut first = PixelMap::new(6, 4);
        first.set(1, 1, RED);
        let frames = vec![first, sample(6, 4)];

        for name in ["anim.gif", "anim.spryte"] {
            let path = dir.path().join(name);
            let written = save(&frames, &path, 100).unwrap();
            assert_eq!(written, vec![path.clone()]);
            assert_eq!(open(&path).unwrap(), frames);
            assert_eq!(probe_dimensions(&path), (6, 4));
        }

        let svg = dir.path().join("still.svg");
        save(&frames[..1], &svg, FRAME_DELAY_MS).unwrap();
        assert_eq!(probe_dimensions(&svg), (6, 4));
        assert!(matches!(open(&svg), Err(SpryteError::WriteOnly(_))));
    }

    #[test]
    fn test_open_failures_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("broken.png");
        fs::write(&broken, b"definitely not a png").unwrap();

        assert!(matches!(open(&broken), Err(SpryteError::Image(_))));
        assert!(matches!(open(&dir.path().join("missing.gif")), Err(SpryteError::Io(_))));
        assert!(matches!(
            open(&dir.path().join("file.bmp")),
            Err(SpryteError::UnsupportedFormat(_))
        ));
        assert_eq!(probe_dimensions(&broken), (1, 1));
        assert_eq!(probe_dimensions(&dir.path().join("missing.svg")), (1, 1));

        let hostile = dir.path().join("hostile.svg");
        fs::write(
            &hostile,
            r#"<svg width="40" height="40"><rect x="1e300" y="0" style="fill:rgb(1,2,3)" /></svg>"#,
        )
        .unwrap();
        assert!(matches!(open(&hostile), Err(SpryteError::WriteOnly(_))));
        assert_eq!(probe_dimensions(&hostile), (2, 2));
    }
}
