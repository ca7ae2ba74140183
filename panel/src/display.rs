use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use crate::render::{PanelFrame, HEIGHT, WIDTH};

/// The one physical output. `push` is a full-frame write; the refresh
/// loop guarantees a single writer at a time.
pub trait DisplaySink {
    fn init(&mut self) -> anyhow::Result<()>;
    fn clear(&mut self) -> anyhow::Result<()>;
    fn push(&mut self, frame: &PanelFrame) -> anyhow::Result<()>;
    fn sleep(&mut self) -> anyhow::Result<()>;
}

/// Host-build sink: writes each frame as a binary PBM so the panel can
/// be inspected without hardware.
pub struct SimDisplay {
    path: PathBuf,
}

impl SimDisplay {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl DisplaySink for SimDisplay {
    fn init(&mut self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
        }
        Ok(())
    }

    fn clear(&mut self) -> anyhow::Result<()> {
        self.push(&PanelFrame::new())
    }

    fn push(&mut self, frame: &PanelFrame) -> anyhow::Result<()> {
        // P4 payload layout matches the framebuffer exactly: 1 bit per
        // pixel, rows padded to whole bytes, MSB first.
        let mut pbm = format!("P4\n{WIDTH} {HEIGHT}\n").into_bytes();
        pbm.extend_from_slice(frame.data());
        fs::write(&self.path, pbm).with_context(|| format!("writing {}", self.path.display()))?;
        debug!("frame written to {}", self.path.display());
        Ok(())
    }

    fn sleep(&mut self) -> anyhow::Result<()> {
        debug!("sim display sleeping");
        Ok(())
    }
}
