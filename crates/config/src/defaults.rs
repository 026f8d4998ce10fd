pub fn default_enabled() -> bool {
    true
}

pub fn default_service_name() -> String {
    "oiwatch".to_string()
}

pub fn default_host() -> String {
    "0.0.0.0".to_string()
}

pub fn default_http_port() -> u16 {
    5000
}

pub fn default_ws_port() -> u16 {
    5001
}

pub fn default_provider_base_url() -> String {
    "https://query2.finance.yahoo.com".to_string()
}

pub fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

pub fn default_timeout_seconds() -> u64 {
    10
}

pub fn default_stream_interval_seconds() -> u64 {
    10
}

pub fn default_channel_capacity() -> usize {
    64
}

pub fn default_top_walls() -> usize {
    5
}

pub fn default_max_pain_deviation_pct() -> f64 {
    2.0
}

pub fn default_wall_proximity_pct() -> f64 {
    3.0
}

pub fn default_bias_ratio() -> f64 {
    1.2
}

pub fn default_volume_fraction_min() -> f64 {
    0.1
}

pub fn default_volume_fraction_max() -> f64 {
    0.5
}

pub fn default_gamma_flip_factor() -> f64 {
    0.98
}

pub fn default_ticker_column() -> String {
    "Ticker".to_string()
}

pub fn default_log_format() -> String {
    "pretty".to_string()
}

pub fn default_log_level() -> String {
    "info".to_string()
}
