//! Test fixtures and constants.

/// Usable agent key (laptop).
pub const KEY_A: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIAlphaKey alice@laptop";

/// Second usable agent key (desktop).
pub const KEY_B: &str = "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAIBravoKey alice@desktop";

/// Key type the store cannot use.
pub const KEY_RSA: &str = "ssh-rsa AAAAB3NzaC1yc2EAAAADAQABAAABAQ alice@old";

pub const NPMRC: &str = "//registry.npmjs.org/:_authToken=op://dev/npm/token\n";

pub const AWS_CONFIG: &str = "[default]\nregion = eu-west-1\n";

/// Env template with a reference, a literal, and a comment.
pub const SAMPLE_ENV: &str = "# app\nAPI_TOKEN=op://dev/api/token\nREGION=eu-west-1\n";

/// DER-looking body that is not valid UTF-8.
pub const KEYSTORE: &[u8] = &[0x30, 0x82, 0xff, 0xfe, 0x00, 0x01];
