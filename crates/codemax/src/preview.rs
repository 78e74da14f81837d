use crate::artifact::extract_html;
use crate::creations::Creation;
use crate::ui::{SessionEvent, SessionObserver};
use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing::{debug, warn};

/// Watches the transcript of one in-flight turn and reports the first
/// complete artifact exactly once
#[derive(Debug, Default)]
pub struct PreviewTracker {
    announced: bool,
}

impl PreviewTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe<'a>(&mut self, text: &'a str) -> Option<&'a str> {
        if self.announced {
            return None;
        }
        let html = extract_html(text)?;
        self.announced = true;
        Some(html)
    }
}

/// Renders creations by writing them to disk and optionally opening a browser
pub struct PreviewSurface {
    dir: PathBuf,
    open_in_browser: bool,
}

impl PreviewSurface {
    pub fn new(dir: PathBuf, open_in_browser: bool) -> Self {
        Self {
            dir,
            open_in_browser,
        }
    }

    pub fn default_dir() -> PathBuf {
        dirs::cache_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("codemax")
            .join("preview")
    }

    pub fn path_for(&self, creation: &Creation) -> PathBuf {
        self.dir.join(format!("{}.html", creation.id))
    }

    /// Write the artifact byte-for-byte and return where it went
    pub fn show(&self, creation: &Creation) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create preview directory {:?}", self.dir))?;

        let path = self.path_for(creation);
        std::fs::write(&path, creation.html.as_bytes())
            .with_context(|| format!("Failed to write preview {:?}", path))?;
        debug!("Wrote preview '{}' to {:?}", creation.name, path);

        if self.open_in_browser {
            open::that(&path).with_context(|| format!("Failed to open {:?}", path))?;
        }
        Ok(path)
    }
}

impl SessionObserver for PreviewSurface {
    fn on_event(&self, event: &SessionEvent<'_>) {
        if let SessionEvent::ActiveCreationChanged(Some(creation)) = event {
            if let Err(e) = self.show(creation) {
                warn!("Could not render preview: {:#}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tracker_announces_once() {
        let mut tracker = PreviewTracker::new();
        assert_eq!(tracker.observe("<html><body>"), None);
        assert_eq!(
            tracker.observe("<html><body></body></html>"),
            Some("<html><body></body></html>")
        );
        assert_eq!(tracker.observe("<html><body></body></html> trailing"), None);
    }

    #[test]
    fn test_show_writes_exact_html() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let surface = PreviewSurface::new(dir.path().join("nested"), false);
        let creation = Creation::from_prompt("clock", "<!DOCTYPE html>\n<html>ü</html>");

        let path = surface.show(&creation)?;

        assert_eq!(path, surface.path_for(&creation));
        assert_eq!(std::fs::read_to_string(&path)?, creation.html);
        Ok(())
    }

    #[test]
    fn test_observer_renders_active_creation() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let surface = PreviewSurface::new(dir.path().to_path_buf(), false);
        let creation = Creation::temporary("<html></html>");

        surface.on_event(&SessionEvent::ActiveCreationChanged(None));
        assert!(!surface.path_for(&creation).exists());

        surface.on_event(&SessionEvent::ActiveCreationChanged(Some(&creation)));
        assert!(surface.path_for(&creation).exists());
        Ok(())
    }
}
