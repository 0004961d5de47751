use scan_relay_common::config::DisplayConfig;
use scan_relay_common::frame::Frame;
use scan_relay_common::payload::DecodedPayload;
#[cfg(feature = "window")]
use tracing::warn;
use tracing::info;

/// Optional live preview with a status line and quit keys.
pub trait Display {
    fn render(&mut self, frame: &Frame, last_seen: Option<&DecodedPayload>);

    /// Returns `true` once the user asked to quit.
    fn poll_cancel(&mut self) -> bool;
}

impl<T: Display + ?Sized> Display for Box<T> {
    fn render(&mut self, frame: &Frame, last_seen: Option<&DecodedPayload>) {
        (**self).render(frame, last_seen)
    }

    fn poll_cancel(&mut self) -> bool {
        (**self).poll_cancel()
    }
}

/// No-op display for headless runs and tests.
#[derive(Debug, Default)]
pub struct Headless;

impl Display for Headless {
    fn render(&mut self, _frame: &Frame, _last_seen: Option<&DecodedPayload>) {}

    fn poll_cancel(&mut self) -> bool {
        false
    }
}

pub fn status_text(last_seen: Option<&DecodedPayload>) -> String {
    match last_seen {
        Some(p) => format!("Last scan: {p}"),
        None => "Last scan: (none)".to_string(),
    }
}

/// Whether a graphical session is reachable from this process.
pub fn graphical_session_available() -> bool {
    if cfg!(target_os = "linux") {
        ["DISPLAY", "WAYLAND_DISPLAY"]
            .iter()
            .any(|var| std::env::var_os(var).is_some_and(|v| !v.is_empty()))
    } else {
        true
    }
}

/// Pick the display for this run. Falls back to headless when no window can be shown.
pub fn open(config: &DisplayConfig, width: u32, height: u32) -> Box<dyn Display> {
    let wanted = config.enabled.unwrap_or_else(graphical_session_available);
    if !wanted {
        info!("display disabled, running headless");
        return Box::new(Headless);
    }
    open_window(width, height)
}

#[cfg(feature = "window")]
fn open_window(width: u32, height: u32) -> Box<dyn Display> {
    match window::WindowDisplay::new(width as usize, height as usize) {
        Ok(w) => {
            info!(width, height, "preview window opened");
            Box::new(w)
        }
        Err(e) => {
            warn!(error = %e, "failed to open preview window, running headless");
            Box::new(Headless)
        }
    }
}

#[cfg(not(feature = "window"))]
fn open_window(_width: u32, _height: u32) -> Box<dyn Display> {
    info!("built without the `window` feature, running headless");
    Box::new(Headless)
}

#[cfg(feature = "window")]
mod window {
    use minifb::{Key, Window, WindowOptions};
    use scan_relay_common::frame::{Frame, PixelFormat};
    use scan_relay_common::payload::DecodedPayload;
    use tracing::{debug, warn};

    use super::{status_text, Display};

    const WINDOW_NAME: &str = "scan-relay";

    pub struct WindowDisplay {
        window: Window,
        argb: Vec<u32>,
        title: String,
    }

    impl WindowDisplay {
        pub fn new(width: usize, height: usize) -> Result<Self, minifb::Error> {
            let title = format!("{WINDOW_NAME} - {}", status_text(None));
            let window = Window::new(&title, width, height, WindowOptions::default())?;
            Ok(Self {
                window,
                argb: Vec::with_capacity(width * height),
                title,
            })
        }
    }

    /// Pack a frame into minifb's 0RGB u32 layout.
    fn to_argb(frame: &Frame, out: &mut Vec<u32>) {
        out.clear();
        match frame.format() {
            PixelFormat::Rgb8 => out.extend(frame.data().chunks_exact(3).map(|px| {
                ((px[0] as u32) << 16) | ((px[1] as u32) << 8) | px[2] as u32
            })),
            PixelFormat::Luma8 => out.extend(
                frame
                    .data()
                    .iter()
                    .map(|&y| ((y as u32) << 16) | ((y as u32) << 8) | y as u32),
            ),
        }
    }

    impl Display for WindowDisplay {
        fn render(&mut self, frame: &Frame, last_seen: Option<&DecodedPayload>) {
            let title = format!("{WINDOW_NAME} - {}", status_text(last_seen));
            if title != self.title {
                self.window.set_title(&title);
                self.title = title;
            }

            to_argb(frame, &mut self.argb);
            if let Err(e) = self.window.update_with_buffer(
                &self.argb,
                frame.width() as usize,
                frame.height() as usize,
            ) {
                warn!(error = %e, "failed to update preview window");
            }
        }

        fn poll_cancel(&mut self) -> bool {
            if !self.window.is_open() {
                debug!("preview window closed");
                return true;
            }
            self.window.is_key_down(Key::Escape) || self.window.is_key_down(Key::Q)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_text_without_value() {
        assert_eq!(status_text(None), "Last scan: (none)");
    }

    #[test]
    fn status_text_with_value() {
        let p = DecodedPayload::from("ABC123");
        assert_eq!(status_text(Some(&p)), "Last scan: ABC123");
    }

    #[test]
    fn headless_never_cancels() {
        let mut display = Headless;
        let frame = Frame::luma(vec![0; 4], 2, 2, 0).unwrap();
        display.render(&frame, None);
        assert!(!display.poll_cancel());
    }

    #[test]
    fn disabled_config_is_headless() {
        let mut display = open(&DisplayConfig { enabled: Some(false) }, 2, 2);
        let frame = Frame::luma(vec![0; 4], 2, 2, 0).unwrap();
        display.render(&frame, None);
        assert!(!display.poll_cancel());
    }
}
