//! A window that displays annotated frames.

use minifb::{Key, WindowOptions};

use crate::{image::Image, resolution::Resolution};

/// A native window showing one [`Image`] at a time.
///
/// The underlying window is (re)created whenever the displayed image changes size, so callers do
/// not need to know the camera resolution in advance.
pub struct Window {
    title: String,
    inner: Option<(minifb::Window, Resolution)>,
}

impl Window {
    /// Creates a window with the given title.
    ///
    /// Nothing appears on screen until the first call to [`Window::show`].
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            inner: None,
        }
    }

    fn reopen(&mut self, res: Resolution) -> anyhow::Result<()> {
        log::debug!("opening {} window '{}'", res, self.title);
        self.inner = None;
        let window = minifb::Window::new(
            &self.title,
            res.width() as usize,
            res.height() as usize,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )?;
        self.inner = Some((window, res));
        Ok(())
    }

    /// Displays `image`, and processes window events.
    pub fn show(&mut self, image: &Image) -> anyhow::Result<()> {
        let res = image.resolution();
        if self.inner.as_ref().map(|(_, current)| *current) != Some(res) {
            self.reopen(res)?;
        }
        if let Some((window, _)) = &mut self.inner {
            let (w, h) = (res.width() as usize, res.height() as usize);
            window.update_with_buffer(&image.to_rgb_u32(), w, h)?;
        }
        Ok(())
    }

    /// Returns `false` once the user has closed the window.
    ///
    /// A window that has not been opened yet counts as open.
    pub fn is_open(&self) -> bool {
        self.inner
            .as_ref()
            .map_or(true, |(window, _)| window.is_open())
    }

    /// Returns whether the quit key (`q`) is held down.
    pub fn quit_requested(&self) -> bool {
        self.inner
            .as_ref()
            .map_or(false, |(window, _)| window.is_key_down(Key::Q))
    }

    /// Returns whether the main loop should keep running.
    pub fn keep_running(&self) -> bool {
        self.is_open() && !self.quit_requested()
    }
}
