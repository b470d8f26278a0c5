const MIB: u64 = 1024 * 1024;

const GIB: u64 = 1024 * MIB;

pub fn to_mib(bytes: u64) -> u64 {
    bytes / MIB
}

pub fn to_gib(bytes: u64) -> u64 {
    bytes / GIB
}

/// `used` as a percentage of `total`; `None` when `total` is zero.
pub fn percent_of(used: u64, total: u64) -> Option<f64> {
    (total > 0).then(|| used as f64 / total as f64 * 100.0)
}

const SMTP_PORT: &str = "SMTP_PORT";

const DEFAULT_SMTP_PORT: u16 = 587;

pub fn get_smtp_port() -> u16 {
    let port_from_env = std::env::var(SMTP_PORT);
    port_from_env.map_or(DEFAULT_SMTP_PORT, |res| res.parse().unwrap_or(DEFAULT_SMTP_PORT))
}
