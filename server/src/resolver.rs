use crate::model::{FormatSelector, StreamVariant};
use std::{error::Error, fmt};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// No variant satisfies the selector.
    NotFound,
    /// More than one variant carries the requested itag. The catalogue
    /// invariant is violated; picking one arbitrarily would hide it.
    DuplicateItag(String),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::NotFound => write!(f, "no matching format"),
            ResolveError::DuplicateItag(itag) => {
                write!(f, "duplicate itag '{}' in format catalogue", itag)
            }
        }
    }
}

impl Error for ResolveError {}

/// Picks exactly one variant from the catalogue. Pure function of its
/// inputs; identical inputs always yield the identical variant.
pub fn resolve<'a>(
    variants: &'a [StreamVariant],
    selector: &FormatSelector,
) -> Result<&'a StreamVariant, ResolveError> {
    match selector {
        FormatSelector::Itag(itag) => {
            let mut found = None;
            for v in variants {
                if v.itag == *itag {
                    if found.is_some() {
                        return Err(ResolveError::DuplicateItag(itag.clone()));
                    }
                    found = Some(v);
                }
            }
            found.ok_or(ResolveError::NotFound)
        }
        FormatSelector::Filtered { quality, container } => variants
            .iter()
            .find(|v| v.quality == *quality && v.container == *container && v.is_progressive())
            .ok_or(ResolveError::NotFound),
        FormatSelector::Highest => {
            let mut best: Option<&StreamVariant> = None;
            for v in variants.iter().filter(|v| v.is_progressive()) {
                best = match best {
                    None => Some(v),
                    Some(b) => {
                        let rank = v.quality_rank();
                        let best_rank = b.quality_rank();
                        // Strict comparisons keep the earliest variant on a
                        // full tie, preserving upstream order.
                        if rank > best_rank
                            || (rank == best_rank
                                && v.size_hint().unwrap_or(0) > b.size_hint().unwrap_or(0))
                        {
                            Some(v)
                        } else {
                            Some(b)
                        }
                    }
                };
            }
            best.ok_or(ResolveError::NotFound)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(itag: &str, quality: &str, audio: bool, video: bool) -> StreamVariant {
        StreamVariant {
            itag: itag.to_string(),
            quality: quality.to_string(),
            container: "mp4".to_string(),
            mime_type: None,
            has_audio: audio,
            has_video: video,
            byte_length: None,
            approx_byte_length: None,
            bitrate: None,
            url: format!("https://example.invalid/{}", itag),
        }
    }

    #[test]
    fn itag_returns_unique_match() {
        let catalogue = vec![variant("18", "360p", true, true), variant("22", "720p", true, true)];
        let picked = resolve(&catalogue, &FormatSelector::Itag("22".to_string())).unwrap();
        assert_eq!(picked.quality, "720p");
    }

    #[test]
    fn itag_absent_is_not_found() {
        let catalogue = vec![variant("18", "360p", true, true)];
        let result = resolve(&catalogue, &FormatSelector::Itag("99".to_string()));
        assert_eq!(result.unwrap_err(), ResolveError::NotFound);
    }

    #[test]
    fn duplicate_itag_fails_loud() {
        let catalogue = vec![variant("22", "720p", true, true), variant("22", "480p", true, true)];
        let result = resolve(&catalogue, &FormatSelector::Itag("22".to_string()));
        assert_eq!(
            result.unwrap_err(),
            ResolveError::DuplicateItag("22".to_string())
        );
    }

    #[test]
    fn filtered_requires_every_predicate() {
        let catalogue = vec![
            variant("1", "480p", true, true),
            variant("2", "720p", true, true),
        ];
        let selector = FormatSelector::Filtered {
            quality: "720p".to_string(),
            container: "mp4".to_string(),
        };
        let picked = resolve(&catalogue, &selector).unwrap();
        assert_eq!(picked.itag, "2");
    }

    #[test]
    fn filtered_never_substitutes_another_quality() {
        // 1080p exists but is video-only; a partial match is not a match.
        let catalogue = vec![
            variant("137", "1080p", false, true),
            variant("18", "360p", true, true),
        ];
        let selector = FormatSelector::Filtered {
            quality: "1080p".to_string(),
            container: "mp4".to_string(),
        };
        assert_eq!(
            resolve(&catalogue, &selector).unwrap_err(),
            ResolveError::NotFound
        );
    }

    #[test]
    fn filtered_takes_first_in_upstream_order() {
        let catalogue = vec![
            variant("a", "720p", true, true),
            variant("b", "720p", true, true),
        ];
        let selector = FormatSelector::Filtered {
            quality: "720p".to_string(),
            container: "mp4".to_string(),
        };
        assert_eq!(resolve(&catalogue, &selector).unwrap().itag, "a");
    }

    #[test]
    fn highest_picks_greatest_rank_over_baseline() {
        let catalogue = vec![
            variant("18", "360p", true, true),
            variant("137", "1080p", false, true), // video-only, outside the baseline
            variant("22", "720p", true, true),
        ];
        let picked = resolve(&catalogue, &FormatSelector::Highest).unwrap();
        assert_eq!(picked.itag, "22");
    }

    #[test]
    fn highest_breaks_rank_ties_by_byte_length() {
        let mut small = variant("a", "720p", true, true);
        small.byte_length = Some(10);
        let mut large = variant("b", "720p", true, true);
        large.byte_length = Some(20);
        let catalogue = vec![small, large];
        assert_eq!(
            resolve(&catalogue, &FormatSelector::Highest).unwrap().itag,
            "b"
        );
    }

    #[test]
    fn highest_tie_break_falls_back_to_approximate_size() {
        let mut small = variant("a", "720p", true, true);
        small.approx_byte_length = Some(10);
        let mut large = variant("b", "720p", true, true);
        large.approx_byte_length = Some(20);
        let catalogue = vec![small, large];
        assert_eq!(
            resolve(&catalogue, &FormatSelector::Highest).unwrap().itag,
            "b"
        );
    }

    #[test]
    fn highest_full_tie_keeps_upstream_order() {
        let catalogue = vec![
            variant("first", "720p", true, true),
            variant("second", "720p", true, true),
        ];
        assert_eq!(
            resolve(&catalogue, &FormatSelector::Highest).unwrap().itag,
            "first"
        );
    }

    #[test]
    fn highest_is_deterministic() {
        let catalogue = vec![
            variant("18", "360p", true, true),
            variant("22", "720p", true, true),
            variant("59", "480p", true, true),
        ];
        let first = resolve(&catalogue, &FormatSelector::Highest).unwrap().itag.clone();
        let second = resolve(&catalogue, &FormatSelector::Highest).unwrap().itag.clone();
        assert_eq!(first, second);
    }

    #[test]
    fn empty_catalogue_is_not_found_for_every_selector() {
        let catalogue: Vec<StreamVariant> = Vec::new();
        for selector in [
            FormatSelector::Itag("18".to_string()),
            FormatSelector::Filtered {
                quality: "720p".to_string(),
                container: "mp4".to_string(),
            },
            FormatSelector::Highest,
        ] {
            assert_eq!(
                resolve(&catalogue, &selector).unwrap_err(),
                ResolveError::NotFound
            );
        }
    }

    #[test]
    fn highest_with_no_progressive_variant_is_not_found() {
        let catalogue = vec![
            variant("137", "1080p", false, true),
            variant("140", "audio", true, false),
        ];
        assert_eq!(
            resolve(&catalogue, &FormatSelector::Highest).unwrap_err(),
            ResolveError::NotFound
        );
    }
}
