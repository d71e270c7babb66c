//! Line-oriented obfuscators for must-gather archives.
//!
//! Every obfuscator rewrites one line (or one relative path) at a time and
//! records what it replaced in its own [`ReplacementTracker`]. A
//! [`Sequence`] chains them in configured order; [`TargetFilter`] limits one
//! to paths or contents.
//!
//! ```ignore
//! let seq = Sequence::new(vec![
//!     Box::new(IpObfuscator::new(ReplacementType::Static, None)?),
//!     Box::new(MacObfuscator::new(ReplacementType::Static, None)?),
//! ]);
//! assert_eq!(seq.contents("from 192.168.1.10")?, "from xxx.xxx.xxx.xxx");
//! ```

pub mod azure;
pub mod cluster_id;
pub mod domain;
pub mod generator;
pub mod ip;
pub mod literal;
pub mod mac;
pub mod obfuscator;
pub mod pattern;
pub mod ssh_key;
pub mod tracker;

pub use azure::AzureObfuscator;
pub use domain::DomainObfuscator;
pub use generator::{Generator, ReplacementType, Template};
pub use ip::IpObfuscator;
pub use literal::LiteralObfuscator;
pub use mac::MacObfuscator;
pub use obfuscator::{Obfuscator, ReportingObfuscator, Sequence, Target, TargetFilter};
pub use pattern::RegexObfuscator;
pub use ssh_key::SshKeyObfuscator;
pub use tracker::ReplacementTracker;
