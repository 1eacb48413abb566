//! Image decoding primitives.
//! Supports JPG, PNG, WEBP, BMP and animated GIF files.

use std::fs::File;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Supported image extensions
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "bmp", "gif"];

/// Check if a file is a supported image
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Errors produced while decoding a file into frames.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to decode {}: {source}", path.display())]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
    #[error("failed to decode {}: {source}", path.display())]
    Gif {
        path: PathBuf,
        source: gif::DecodingError,
    },
    #[error("{} contains no frames", path.display())]
    Empty { path: PathBuf },
}

/// A single RGBA frame. Static images have exactly one with a zero delay.
#[derive(Debug, Clone)]
pub struct ImageFrame {
    pub pixels: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub delay_ms: u32,
}

/// A decoded image at its original resolution.
#[derive(Debug)]
pub struct LoadedImage {
    pub path: PathBuf,
    pub frames: Vec<ImageFrame>,
    pub original_width: u32,
    pub original_height: u32,
}

impl LoadedImage {
    /// Decode an image from disk. GIF files go through the animation decoder,
    /// everything else through the `image` crate.
    pub fn load(path: &Path) -> Result<Self, DecodeError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        if extension == "gif" {
            Self::load_gif(path)
        } else {
            Self::load_static(path)
        }
    }

    fn load_static(path: &Path) -> Result<Self, DecodeError> {
        let img = image::open(path).map_err(|source| DecodeError::Image {
            path: path.to_path_buf(),
            source,
        })?;

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let frame = ImageFrame {
            pixels: rgba.into_raw(),
            width,
            height,
            delay_ms: 0,
        };

        Ok(LoadedImage {
            path: path.to_path_buf(),
            frames: vec![frame],
            original_width: width,
            original_height: height,
        })
    }

    fn load_gif(path: &Path) -> Result<Self, DecodeError> {
        let file = File::open(path).map_err(|source| DecodeError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::RGBA);
        let mut decoder = options.read_info(file).map_err(|source| DecodeError::Gif {
            path: path.to_path_buf(),
            source,
        })?;

        let width = decoder.width() as u32;
        let height = decoder.height() as u32;

        // Frames are deltas against the logical screen, so composite each one
        // onto a persistent canvas.
        let mut canvas = vec![0u8; (width * height * 4) as usize];
        let mut frames = Vec::new();

        loop {
            let frame = match decoder.read_next_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(source) => {
                    return Err(DecodeError::Gif {
                        path: path.to_path_buf(),
                        source,
                    })
                }
            };

            // GIF delays are centiseconds; a zero delay means "as fast as
            // possible", which viewers conventionally clamp to 100ms.
            let delay_ms = match (frame.delay as u32) * 10 {
                0 => 100,
                d => d,
            };

            let frame_x = frame.left as usize;
            let frame_y = frame.top as usize;
            let frame_width = frame.width as usize;
            let frame_height = frame.height as usize;

            for y in 0..frame_height {
                for x in 0..frame_width {
                    let src_idx = (y * frame_width + x) * 4;
                    let dst_x = frame_x + x;
                    let dst_y = frame_y + y;
                    if dst_x >= width as usize || dst_y >= height as usize {
                        continue;
                    }
                    let dst_idx = (dst_y * width as usize + dst_x) * 4;
                    // Skip fully transparent source pixels
                    if frame.buffer.len() > src_idx + 3 && frame.buffer[src_idx + 3] > 0 {
                        canvas[dst_idx..dst_idx + 4]
                            .copy_from_slice(&frame.buffer[src_idx..src_idx + 4]);
                    }
                }
            }

            frames.push(ImageFrame {
                pixels: canvas.clone(),
                width,
                height,
                delay_ms,
            });
        }

        if frames.is_empty() {
            return Err(DecodeError::Empty {
                path: path.to_path_buf(),
            });
        }

        Ok(LoadedImage {
            path: path.to_path_buf(),
            frames,
            original_width: width,
            original_height: height,
        })
    }

    /// Check if this is an animated image
    pub fn is_animated(&self) -> bool {
        self.frames.len() > 1
    }
}

/// Largest size with the same aspect ratio that fits inside `max_w` x `max_h`.
/// Never returns a zero dimension.
pub fn fit_within(width: u32, height: u32, max_w: u32, max_h: u32) -> (u32, u32) {
    if width == 0 || height == 0 || max_w == 0 || max_h == 0 {
        return (1, 1);
    }
    let ratio = (max_w as f64 / width as f64).min(max_h as f64 / height as f64);
    let w = ((width as f64) * ratio).round().max(1.0) as u32;
    let h = ((height as f64) * ratio).round().max(1.0) as u32;
    (w, h)
}

/// Natural ordering for filenames: digit runs compare numerically, everything
/// else case-insensitively, so `img2.png` sorts before `img10.png`.
pub mod natord {
    use std::cmp::Ordering;
    use std::iter::Peekable;
    use std::str::Chars;

    pub fn compare(a: &str, b: &str) -> Ordering {
        let mut a_chars = a.chars().peekable();
        let mut b_chars = b.chars().peekable();

        loop {
            match (a_chars.peek(), b_chars.peek()) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some(&ac), Some(&bc)) => {
                    if ac.is_ascii_digit() && bc.is_ascii_digit() {
                        let a_run = digit_run(&mut a_chars);
                        let b_run = digit_run(&mut b_chars);
                        match compare_digit_runs(&a_run, &b_run) {
                            Ordering::Equal => continue,
                            other => return other,
                        }
                    } else {
                        let ac_lower = ac.to_lowercase().next().unwrap_or(ac);
                        let bc_lower = bc.to_lowercase().next().unwrap_or(bc);
                        match ac_lower.cmp(&bc_lower) {
                            Ordering::Equal => {
                                a_chars.next();
                                b_chars.next();
                            }
                            other => return other,
                        }
                    }
                }
            }
        }
    }

    fn digit_run(chars: &mut Peekable<Chars>) -> String {
        let mut run = String::new();
        while let Some(&c) = chars.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            run.push(c);
            chars.next();
        }
        run
    }

    /// Numeric comparison without parsing, so arbitrarily long runs work:
    /// strip leading zeros, then longer runs are larger, then lexicographic.
    fn compare_digit_runs(a: &str, b: &str) -> Ordering {
        let a = a.trim_start_matches('0');
        let b = b.trim_start_matches('0');
        a.len().cmp(&b.len()).then_with(|| a.cmp(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cmp::Ordering;

    #[test]
    fn extension_filter() {
        assert!(is_supported_image(Path::new("a/b/photo.JPG")));
        assert!(is_supported_image(Path::new("anim.gif")));
        assert!(is_supported_image(Path::new("pic.webp")));
        assert!(!is_supported_image(Path::new("movie.mp4")));
        assert!(!is_supported_image(Path::new("noext")));
    }

    #[test]
    fn fit_preserves_aspect_ratio() {
        assert_eq!(fit_within(200, 100, 100, 100), (100, 50));
        assert_eq!(fit_within(100, 200, 100, 100), (50, 100));
        assert_eq!(fit_within(50, 50, 100, 100), (100, 100));
        assert_eq!(fit_within(1920, 1080, 1920, 1080), (1920, 1080));
    }

    #[test]
    fn fit_never_zero() {
        assert_eq!(fit_within(10000, 1, 10, 10), (10, 1));
        assert_eq!(fit_within(0, 0, 100, 100), (1, 1));
    }

    #[test]
    fn natural_order_numbers() {
        assert_eq!(natord::compare("img2.png", "img10.png"), Ordering::Less);
        assert_eq!(natord::compare("img10.png", "img2.png"), Ordering::Greater);
        assert_eq!(natord::compare("img02.png", "img2.png"), Ordering::Equal);
        assert_eq!(natord::compare("a1b2", "a1b2"), Ordering::Equal);
    }

    #[test]
    fn natural_order_case_insensitive() {
        assert_eq!(natord::compare("Apple", "apple"), Ordering::Equal);
        assert_eq!(natord::compare("Apple", "banana"), Ordering::Less);
    }

    #[test]
    fn natural_order_huge_runs() {
        // Longer than u64 can hold; must still order correctly.
        let small = "f99999999999999999999.png";
        let big = "f100000000000000000000.png";
        assert_eq!(natord::compare(small, big), Ordering::Less);
    }

    #[test]
    fn natural_order_prefix() {
        assert_eq!(natord::compare("abc", "abcd"), Ordering::Less);
        assert_eq!(natord::compare("abcd", "abc"), Ordering::Greater);
    }

    fn write_two_frame_gif(path: &Path, delay_cs: u16) {
        let mut file = File::create(path).unwrap();
        let mut encoder = gif::Encoder::new(&mut file, 4, 4, &[]).unwrap();
        encoder.set_repeat(gif::Repeat::Infinite).unwrap();
        for color in [[255u8, 0, 0, 255], [0, 0, 255, 255]] {
            let mut pixels: Vec<u8> = color.iter().copied().cycle().take(4 * 4 * 4).collect();
            let mut frame = gif::Frame::from_rgba_speed(4, 4, &mut pixels, 10);
            frame.delay = delay_cs;
            encoder.write_frame(&frame).unwrap();
        }
    }

    #[test]
    fn decodes_static_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("red.png");
        image::RgbaImage::from_pixel(20, 10, image::Rgba([255, 0, 0, 255]))
            .save(&path)
            .unwrap();

        let loaded = LoadedImage::load(&path).unwrap();
        assert_eq!((loaded.original_width, loaded.original_height), (20, 10));
        assert_eq!(loaded.frames.len(), 1);
        assert!(!loaded.is_animated());
        assert_eq!(loaded.frames[0].delay_ms, 0);
        assert_eq!(&loaded.frames[0].pixels[..4], &[255, 0, 0, 255]);
    }

    #[test]
    fn decodes_animated_gif_with_delays() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("anim.gif");
        write_two_frame_gif(&path, 5);

        let loaded = LoadedImage::load(&path).unwrap();
        assert!(loaded.is_animated());
        assert_eq!(loaded.frames.len(), 2);
        assert_eq!((loaded.original_width, loaded.original_height), (4, 4));
        assert_eq!(loaded.frames[0].delay_ms, 50);
        assert_eq!(loaded.frames[1].delay_ms, 50);
    }

    #[test]
    fn zero_gif_delay_clamps_to_100ms() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fast.gif");
        write_two_frame_gif(&path, 0);

        let loaded = LoadedImage::load(&path).unwrap();
        assert_eq!(loaded.frames[0].delay_ms, 100);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = LoadedImage::load(Path::new("/no/such/file.png")).unwrap_err();
        assert!(err.to_string().contains("file.png"));
    }
}
