use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};

use crate::error::{Result, TreeError};

/// An external graph layout service.
pub trait LayoutEngine {
    /// Lay out a DOT description and return the positioned DOT text.
    fn layout(&self, dot: &str) -> Result<String>;
    /// Lay out and write the drawing to `path` in `format` (png, svg, ...).
    fn draw(&self, dot: &str, format: &str, path: &Path) -> Result<()>;
}

/// Graphviz, run as a subprocess reading DOT on stdin.
#[derive(Clone, Debug)]
pub struct Graphviz {
    program: String,
}

impl Default for Graphviz {
    fn default() -> Self {
        Self::new("dot")
    }
}

impl Graphviz {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn run(&self, args: &[String], dot: &str) -> Result<Vec<u8>> {
        log::debug!("running {} {}", self.program, args.join(" "));
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                TreeError::Layout(format!(
                    "cannot run '{}': {} (is Graphviz installed?)",
                    self.program, e
                ))
            })?;
        // dot reads its whole input before writing anything
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(dot.as_bytes())?;
        }
        let output = child.wait_with_output()?;
        if !output.status.success() {
            return Err(TreeError::Layout(format!(
                "'{}' exited with {}: {}",
                self.program,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(output.stdout)
    }
}

impl LayoutEngine for Graphviz {
    fn layout(&self, dot: &str) -> Result<String> {
        let out = self.run(&["-Tdot".to_string()], dot)?;
        String::from_utf8(out)
            .map_err(|e| TreeError::Layout(format!("layout output is not UTF-8: {}", e)))
    }

    fn draw(&self, dot: &str, format: &str, path: &Path) -> Result<()> {
        let args = [format!("-T{}", format), format!("-o{}", path.display())];
        self.run(&args, dot)?;
        Ok(())
    }
}

/// Output format for a target file, from its extension; png when absent.
pub fn format_for(path: &Path) -> String {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
    {
        Some(ext) if ext == "gv" => "dot".to_string(),
        Some(ext) if !ext.is_empty() => ext,
        _ => "png".to_string(),
    }
}
