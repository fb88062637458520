//! Closed vocabularies of the Metrics v3 API.
//!
//! The API rejects anything outside these lists, so the request builder checks
//! every metric, dimension and granularity against them before a request is
//! sent. Matching is exact and case-sensitive; tokens are never trimmed or
//! case-folded.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Granularity applied when the caller supplies one the API does not accept.
pub const DEFAULT_GRANULARITY: &str = "PT1H";

/// Metric names accepted by the `/metrics` and `/real-time-metrics` endpoints.
pub const METRICS: &[&str] = &[
    "ad-actual-duration", "ad-attempts", "ad-bitrate", "ad-completed-creative-plays",
    "ad-concurrent-plays", "ad-connection-induced-rebuffering-ratio", "ad-ended-plays",
    "exits-before-ad-start", "ad-framerate", "ad-minutes-played", "ad-percentage-complete",
    "ad-impressions", "ad-rebuffering-ratio", "ad-unique-devices", "ad-video-playback-failures",
    "ad-video-restart-time", "ad-video-start-failures", "ad-video-start-time", "attempts",
    "attempts-with-pre-roll", "attempts-without-pre-roll", "bad-session",
    "bad-session-average-life-playing-time-mins", "bad-unique-devices", "bad-unique-viewers",
    "bitrate", "concurrent-plays", "connection-induced-rebuffering-ratio", "ended-plays",
    "ended-plays-with-ads", "ended-plays-without-ads", "exits-before-video-start", "framerate",
    "good-session", "good-session-average-life-playing-time-mins", "good-unique-devices",
    "good-unique-viewers", "abandonment", "abandonment-with-pre-roll",
    "abandonment-without-pre-roll", "high-rebuffering", "high-rebuffering-with-ads",
    "high-rebuffering-without-ads", "high-startup-time", "high-startup-time-with-pre-roll",
    "high-startup-time-without-pre-roll", "interval-minutes-played", "low-bitrate",
    "low-bitrate-with-ads", "low-bitrate-without-ads", "minutes-played",
    "non-zero-cirr-ended-plays", "percentage-complete", "plays", "rebuffering-ratio",
    "spi-streams", "spi-unique-devices", "spi-unique-viewers", "streaming-performance-index",
    "unique-devices", "video-playback-failures", "video-playback-failures-business",
    "video-playback-failures-tech", "video-playback-failures-tech-with-ads",
    "video-playback-failures-tech-without-ads", "video-restart-time", "video-start-failures",
    "video-start-failures-business", "video-start-failures-tech",
    "video-start-failures-tech-with-pre-roll", "video-start-failures-tech-without-pre-roll",
    "video-start-time", "zero-cirr-ended-plays",
];

/// Dimension names usable as query-parameter filters (`device_os=iOS`).
pub const FILTER_DIMENSIONS: &[&str] = &[
    "ad_break_id", "ad_break_index", "ad_campaign_name", "ad_category", "ad_creative_id",
    "ad_creative_name", "ad_creative_type", "ad_day_part", "ad_deal_id", "ad_fallback_index",
    "ad_first_ad_id", "ad_first_ad_system", "ad_first_creative_id", "ad_id", "ad_is_slate",
    "ad_manager_name", "ad_manager_version", "ad_media_file_api_framework", "ad_planned_duration",
    "ad_position", "ad_sequence", "ad_session_start_event", "ad_stitcher", "ad_system",
    "ad_technology", "ad_type", "ad_unit_name", "ad_video_asset_name", "advertiser",
    "advertiser_category", "advertiser_id", "advertiser_name", "app_version", "asn", "asset",
    "asset_type", "browser_name", "browser_version", "cdn", "cdn_edge_group", "cdn_edge_server",
    "connection_type", "content_category", "content_meta_affiliate", "content_meta_brand",
    "content_meta_category_type", "content_meta_channel", "content_meta_content_type",
    "content_meta_episode_number", "content_meta_genre", "content_meta_genre_list",
    "content_meta_id", "content_meta_name", "content_meta_season_number",
    "content_meta_series_name", "content_meta_show_title", "conviva_core_sdk_version", "customer",
    "device_category", "device_hardware_type", "device_manufacturer", "device_marketing_name",
    "device_model", "device_name", "device_os", "device_os_family", "device_os_version",
    "geo_city_name", "geo_continent_name", "geo_country_code", "geo_dma", "geo_postal_code",
    "geo_state_name", "is_ad_requested", "isp", "network_connection_type", "platform",
    "platform_version", "player_name", "player_framework_name", "player_framework_version",
    "precision_algo_id", "precision_cdn", "precision_rs", "preroll_status", "stream_host",
    "user_agent", "utm_tracking_code", "video_asset_name", "video_playback_failure_business_error",
    "video_playback_failure_error", "video_playback_failure_tech_error",
    "video_start_failure_business_error", "video_start_failure_error",
    "video_start_failure_tech_error",
];

/// Dimension names usable as a `/group-by/{dimension}` path segment.
///
/// Same dimensions as [`FILTER_DIMENSIONS`] spelled with hyphens, plus two
/// ad failure dimensions that can only be grouped on.
pub const GROUP_BY_DIMENSIONS: &[&str] = &[
    "ad-break-id", "ad-break-index", "ad-campaign-name", "ad-category", "ad-creative-id",
    "ad-creative-name", "ad-creative-type", "ad-day-part", "ad-deal-id", "ad-fallback-index",
    "ad-first-ad-id", "ad-first-ad-system", "ad-first-creative-id", "ad-id", "ad-is-slate",
    "ad-manager-name", "ad-manager-version", "ad-media-file-api-framework", "ad-planned-duration",
    "ad-position", "ad-sequence", "ad-session-start-event", "ad-stitcher", "ad-system",
    "ad-technology", "ad-type", "ad-unit-name", "ad-video-asset-name", "advertiser",
    "advertiser-category", "advertiser-id", "advertiser-name", "app-version", "asn", "asset",
    "asset-type", "browser-name", "browser-version", "cdn", "cdn-edge-group", "cdn-edge-server",
    "connection-type", "content-category", "content-meta-affiliate", "content-meta-brand",
    "content-meta-category-type", "content-meta-channel", "content-meta-content-type",
    "content-meta-episode-number", "content-meta-genre", "content-meta-genre-list",
    "content-meta-id", "content-meta-name", "content-meta-season-number",
    "content-meta-series-name", "content-meta-show-title", "conviva-core-sdk-version", "customer",
    "device-category", "device-hardware-type", "device-manufacturer", "device-marketing-name",
    "device-model", "device-name", "device-os", "device-os-family", "device-os-version",
    "geo-city-name", "geo-continent-name", "geo-country-code", "geo-dma", "geo-postal-code",
    "geo-state-name", "is-ad-requested", "isp", "network-connection-type", "platform",
    "platform-version", "player-name", "player-framework-name", "player-framework-version",
    "precision-algo-id", "precision-cdn", "precision-rs", "preroll-status", "stream-host",
    "user-agent", "utm-tracking-code", "video-asset-name", "video-playback-failure-error",
    "video-playback-failure-business-error", "video-playback-failure-tech-error",
    "video-start-failure-error", "video-start-failure-business-error",
    "video-start-failure-tech-error", "ad-video-start-failure-error",
    "ad-video-playback-failure-error",
];

/// ISO-8601 duration codes for historical time-series buckets, plus `ALL`.
pub const GRANULARITIES: &[&str] = &[
    "PT1M", "PT2M", "PT3M", "PT4M", "PT5M", "PT6M", "PT10M", "PT12M", "PT15M", "PT20M", "PT30M",
    "PT1H", "PT2H", "PT3H", "PT4H", "PT5H", "PT6H", "PT7H", "PT8H", "PT9H", "PT10H", "PT11H",
    "PT12H", "PT13H", "PT14H", "PT15H", "PT16H", "PT17H", "PT18H", "PT19H", "PT20H", "PT21H",
    "PT22H", "PT23H", "P1D", "P2D", "P3D", "P4D", "P5D", "P6D", "P7D", "P8D", "P9D", "P10D",
    "P11D", "P12D", "P13D", "P14D", "P15D", "P16D", "P17D", "P18D", "P19D", "P20D", "P21D", "P22D",
    "P23D", "P24D", "P25D", "P26D", "P27D", "P28D", "P29D", "P30D", "P1W", "P2W", "P3W", "P4W",
    "P5W", "P6W", "P7W", "P8W", "P9W", "P10W", "ALL",
];

static METRIC_SET: Lazy<HashSet<&'static str>> = Lazy::new(|| METRICS.iter().copied().collect());
static FILTER_DIMENSION_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| FILTER_DIMENSIONS.iter().copied().collect());
static GROUP_BY_DIMENSION_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| GROUP_BY_DIMENSIONS.iter().copied().collect());
static GRANULARITY_SET: Lazy<HashSet<&'static str>> =
    Lazy::new(|| GRANULARITIES.iter().copied().collect());

// Deliberately loose: calendar ranges are not checked, so `2024-13-45T99:99:99Z` passes.
static ISO_TIMESTAMP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}[A-Z]{1,4}$").expect("iso timestamp regex")
});

/// One of the closed token sets the API validates against.
///
/// # Examples
///
/// ```
/// use conviva_metrics::vocabulary::Vocabulary;
///
/// assert!(Vocabulary::Metric.contains("plays"));
/// assert!(!Vocabulary::Metric.contains("Plays"));
/// assert!(Vocabulary::GroupByDimension.contains("device-os"));
/// assert!(Vocabulary::FilterDimension.contains("device_os"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vocabulary {
    /// Metric names.
    Metric,
    /// Underscore-spelled dimensions used as filters.
    FilterDimension,
    /// Hyphen-spelled dimensions used for grouping.
    GroupByDimension,
    /// Time-bucket granularity codes.
    Granularity,
}

impl Vocabulary {
    /// Returns `true` if `token` is a member of this vocabulary.
    pub fn contains(&self, token: &str) -> bool {
        self.set().contains(token)
    }

    /// Returns every token of this vocabulary in the API's documented order.
    pub fn tokens(&self) -> &'static [&'static str] {
        match self {
            Vocabulary::Metric => METRICS,
            Vocabulary::FilterDimension => FILTER_DIMENSIONS,
            Vocabulary::GroupByDimension => GROUP_BY_DIMENSIONS,
            Vocabulary::Granularity => GRANULARITIES,
        }
    }

    fn set(&self) -> &'static HashSet<&'static str> {
        match self {
            Vocabulary::Metric => &*METRIC_SET,
            Vocabulary::FilterDimension => &*FILTER_DIMENSION_SET,
            Vocabulary::GroupByDimension => &*GROUP_BY_DIMENSION_SET,
            Vocabulary::Granularity => &*GRANULARITY_SET,
        }
    }
}

/// Returns `true` if `token` is a known metric name.
pub fn is_metric(token: &str) -> bool {
    Vocabulary::Metric.contains(token)
}

/// Returns `true` if `token` is a known filter dimension.
pub fn is_filter_dimension(token: &str) -> bool {
    Vocabulary::FilterDimension.contains(token)
}

/// Returns `true` if `token` is a known group-by dimension.
pub fn is_group_by_dimension(token: &str) -> bool {
    Vocabulary::GroupByDimension.contains(token)
}

/// Returns `true` if `token` is an accepted granularity code.
pub fn is_granularity(token: &str) -> bool {
    Vocabulary::Granularity.contains(token)
}

/// Returns `true` if `value` has the shape `YYYY-MM-DDTHH:MM:SS` followed by a
/// one to four letter uppercase zone designator, e.g. `2024-01-01T00:00:00Z`.
///
/// The whole string must match.
///
/// # Examples
///
/// ```
/// use conviva_metrics::vocabulary::is_iso_timestamp;
///
/// assert!(is_iso_timestamp("2024-01-01T00:00:00Z"));
/// assert!(is_iso_timestamp("2024-01-01T00:00:00UTC"));
/// assert!(!is_iso_timestamp("2024-01-01"));
/// ```
pub fn is_iso_timestamp(value: &str) -> bool {
    ISO_TIMESTAMP.is_match(value)
}
