//! SSH public keys in authorized_keys form (`<type> <base64 blob>`).
//!
//! A candidate only counts when its blob decodes and starts with the same
//! key type, which keeps look-alike text (and our own placeholders) out.

use std::sync::LazyLock;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use mgc_core::{ReplacementReport, Result};
use regex::Regex;

use crate::{Generator, Obfuscator, ReplacementTracker, ReplacementType, ReportingObfuscator};

static SSH_KEY_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(ssh-rsa|ssh-dss|ssh-ed25519|ecdsa-sha2-nistp(?:256|384|521)|sk-ssh-ed25519@openssh\.com|sk-ecdsa-sha2-nistp256@openssh\.com)\s+([A-Za-z0-9+/]{16,}={0,2})",
    )
    .unwrap()
});

pub const SSH_KEY_TEMPLATE: &str = "x-sshkey-%010d-x";
pub const STATIC_SSH_KEY: &str = "x-sshkey-x";

pub struct SshKeyObfuscator {
    generator: Generator,
    tracker: ReplacementTracker,
}

impl SshKeyObfuscator {
    pub fn new(mode: ReplacementType, max_count: Option<u64>) -> Result<Self> {
        Ok(Self {
            generator: Generator::new(mode, SSH_KEY_TEMPLATE, STATIC_SSH_KEY, max_count)?,
            tracker: ReplacementTracker::new(),
        })
    }

    fn obfuscate(&self, input: &str) -> Result<String> {
        if !input.contains("ssh-") && !input.contains("ecdsa-") {
            return Ok(input.to_string());
        }

        let mut output = String::with_capacity(input.len());
        let mut last = 0;
        for caps in SSH_KEY_REGEX.captures_iter(input) {
            let (Some(whole), Some(key_type), Some(blob)) = (caps.get(0), caps.get(1), caps.get(2))
            else {
                continue;
            };
            if !is_valid_key(key_type.as_str(), blob.as_str()) {
                continue;
            }

            let canonical = format!("{} {}", key_type.as_str(), blob.as_str());
            let replacement =
                self.tracker
                    .generate_if_absent(&canonical, whole.as_str(), 1, || {
                        match self.generator.mode() {
                            // Static keeps the key type, drops the material.
                            ReplacementType::Static => Ok(format!(
                                "{} {}",
                                key_type.as_str(),
                                self.generator.generate_static()
                            )),
                            ReplacementType::Consistent => self.generator.generate_consistent(),
                        }
                    })?;

            output.push_str(&input[last..whole.start()]);
            output.push_str(&replacement);
            last = whole.end();
        }
        output.push_str(&input[last..]);
        Ok(output)
    }
}

/// Wire format: u32 big-endian length, then the key type name.
fn is_valid_key(key_type: &str, blob: &str) -> bool {
    let Ok(decoded) = STANDARD.decode(blob) else {
        return false;
    };
    let Some(len_bytes) = decoded.get(..4) else {
        return false;
    };
    let len = u32::from_be_bytes([len_bytes[0], len_bytes[1], len_bytes[2], len_bytes[3]]) as usize;
    decoded.get(4..4 + len) == Some(key_type.as_bytes())
}

impl Obfuscator for SshKeyObfuscator {
    fn path(&self, input: &str) -> Result<String> {
        self.obfuscate(input)
    }

    fn contents(&self, input: &str) -> Result<String> {
        self.obfuscate(input)
    }
}

impl ReportingObfuscator for SshKeyObfuscator {
    fn kind(&self) -> &'static str {
        "ssh_key"
    }

    fn tracker(&self) -> &ReplacementTracker {
        &self.tracker
    }

    fn initialize(&self, report: &ReplacementReport) -> Result<()> {
        self.tracker.initialize(report)?;
        for r in &report.replacements {
            self.generator.observe(&r.replaced_with);
        }
        Ok(())
    }
}
