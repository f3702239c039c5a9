//! Human-facing status lines

use super::{ProgressEvent, ProgressHandler};
use std::io::{self, IsTerminal, Write};
use std::sync::Mutex;

/// Prints one status line per event
///
/// Write errors are swallowed; losing a status line must never fail a run.
pub struct ConsoleHandler {
    out: Mutex<Box<dyn Write + Send>>,
    styled: bool,
}

impl ConsoleHandler {
    pub fn new(out: Box<dyn Write + Send>, styled: bool) -> Self {
        Self {
            out: Mutex::new(out),
            styled,
        }
    }

    /// Standard output, bold URLs only when attached to a terminal
    pub fn stdout() -> Self {
        let styled = io::stdout().is_terminal();
        Self::new(Box::new(io::stdout()), styled)
    }

    fn bold(&self, text: &str) -> String {
        if self.styled {
            format!("\x1b[1m{}\x1b[0m", text)
        } else {
            text.to_string()
        }
    }

    fn line(&self, text: String) {
        if let Ok(mut out) = self.out.lock() {
            let _ = writeln!(out, "{}", text);
            let _ = out.flush();
        }
    }

    fn stage_header(stage: &str) -> Option<&'static str> {
        match stage {
            "entrypoint" => Some("📍 Locating entrypoint"),
            "dockerfile" => Some("🐳 Checking container build files"),
            "image-build" => Some("🏗  Trying Docker image build"),
            "manifests" => Some("☸️  Generating YAMLs for Kubernetes"),
            "cluster" => Some("⚓ Creating a test cluster with k3d"),
            "introspect" => Some("🔎 Looking up ingress ports"),
            "deploy" => Some("🚀 Deploying apps to Kubernetes"),
            "terraform" => Some("📦 Generating Terraform file for Azure Kubernetes Service"),
            _ => None,
        }
    }
}

impl ProgressHandler for ConsoleHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::Started { .. } => self.line("🙌 GEPP Starting!".to_string()),
            ProgressEvent::StageStarted { stage } => {
                if let Some(header) = Self::stage_header(stage) {
                    self.line(header.to_string());
                }
            }
            ProgressEvent::StageFinished { .. } => {}
            ProgressEvent::StageSkipped { stage, reason } => {
                self.line(format!("   - Passing {} phase: {}", stage, reason));
            }
            ProgressEvent::StageFailed { stage, error, .. } => {
                self.line(format!("   - {} failed. ❌ Details:", stage));
                self.line(format!("{}\n{}", error.trim_end(), "-".repeat(20)));
            }
            ProgressEvent::EntrypointLocated { path, found } => {
                if *found {
                    self.line(format!("   - {}... Present. ✅", path));
                } else {
                    self.line(format!("   - {}... Not found ❌", path));
                }
            }
            ProgressEvent::ArtifactChecked { path, created } => {
                if *created {
                    self.line(format!("   - Checking for {}... Not found. Created! ✅", path));
                } else {
                    self.line(format!("   - Checking for {}... Found. ✅", path));
                }
            }
            ProgressEvent::RuntimeConnected { version } => {
                self.line(format!("   - Connected Docker version {} ✅", version));
            }
            ProgressEvent::ImageBuilt { reference } => {
                self.line(format!("   - Tagged with {} ✅", self.bold(reference)));
            }
            ProgressEvent::ImageFailed { reference, error } => {
                self.line(format!("   - Building {} failed. ❌ {}... Continuing...", reference, error));
            }
            ProgressEvent::ClusterProbed { name, exists } => {
                if *exists {
                    self.line(format!("   - Cluster {}... Found. Continuing... ✅", name));
                } else {
                    self.line(format!("   - Cluster {}... Not found, creating a new one.", name));
                }
            }
            ProgressEvent::ClusterCreated { name } => {
                self.line(format!("   - Created cluster {} ✅", name));
            }
            ProgressEvent::KubeconfigMerged { path } => {
                self.line(format!("   - Creating/Merging {}... Saved. ✅", path));
            }
            ProgressEvent::ImageImported { reference } => {
                self.line(format!("   - Importing image {} to the cluster... Done. ✅", reference));
            }
            ProgressEvent::PortsDiscovered {
                http_url,
                https_url,
            } => {
                if http_url.is_none() && https_url.is_none() {
                    self.line("   - No ingress ports published".to_string());
                }
                if let Some(url) = http_url {
                    self.line(format!(
                        "   - Connect to Kubernetes Ingress via HTTP using {}",
                        self.bold(url)
                    ));
                }
                if let Some(url) = https_url {
                    self.line(format!(
                        "   - Connect to Kubernetes Ingress via HTTPS using {}",
                        self.bold(url)
                    ));
                }
            }
            ProgressEvent::DeployStep {
                step,
                success,
                detail,
            } => {
                if *success {
                    self.line(format!("   - {}... Done!", step));
                } else {
                    self.line(format!("   - {}... ❌ {}", step, detail.trim_end()));
                }
            }
            ProgressEvent::TerraformWritten { path } => {
                self.line(format!("   - Available in {} ✅", self.bold(path)));
            }
            ProgressEvent::Completed { exit_code, .. } => {
                if *exit_code == 0 {
                    self.line("Done! ✅".to_string());
                } else {
                    self.line("Stopped. ❌".to_string());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_urls_printed() {
        let buf = SharedBuf::default();
        let handler = ConsoleHandler::new(Box::new(buf.clone()), false);

        handler.on_progress(&ProgressEvent::PortsDiscovered {
            http_url: Some("http://localhost:38080".to_string()),
            https_url: Some("https://localhost:38443".to_string()),
        });

        let text = buf.text();
        assert!(text.contains("via HTTP using http://localhost:38080\n"));
        assert!(text.contains("via HTTPS using https://localhost:38443\n"));
    }

    #[test]
    fn test_styled_output_bolds_references() {
        let buf = SharedBuf::default();
        let handler = ConsoleHandler::new(Box::new(buf.clone()), true);

        handler.on_progress(&ProgressEvent::ImageBuilt {
            reference: "myapp:abc12345".to_string(),
        });

        assert!(buf.text().contains("\x1b[1mmyapp:abc12345\x1b[0m"));
    }

    #[test]
    fn test_stage_headers_and_completion() {
        let buf = SharedBuf::default();
        let handler = ConsoleHandler::new(Box::new(buf.clone()), false);

        handler.on_progress(&ProgressEvent::StageStarted {
            stage: "cluster".to_string(),
        });
        handler.on_progress(&ProgressEvent::StageStarted {
            stage: "introspect".to_string(),
        });
        handler.on_progress(&ProgressEvent::Completed {
            total_time: Duration::from_secs(1),
            exit_code: 1,
        });

        assert_eq!(
            buf.text(),
            "⚓ Creating a test cluster with k3d\n🔎 Looking up ingress ports\nStopped. ❌\n"
        );
    }

    #[test]
    fn test_no_published_ports() {
        let buf = SharedBuf::default();
        let handler = ConsoleHandler::new(Box::new(buf.clone()), false);

        handler.on_progress(&ProgressEvent::PortsDiscovered {
            http_url: None,
            https_url: None,
        });
        handler.on_progress(&ProgressEvent::PortsDiscovered {
            http_url: Some("http://localhost:38080".to_string()),
            https_url: None,
        });

        assert_eq!(
            buf.text(),
            "   - No ingress ports published\n   - Connect to Kubernetes Ingress via HTTP using http://localhost:38080\n"
        );
    }
}
