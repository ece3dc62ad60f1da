use serde::{Deserialize, Serialize};

use crate::campaign::BudgetMode;
use crate::creative::CreativeAssets;

/// How ads are built from the generated media.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdCreationStrategy {
    SingleImage,
    SingleVideo,
    /// One carousel ad holding every image.
    Carousel,
    /// One ad per image or video, each in its own ad set.
    MultipleAds,
}

impl AdCreationStrategy {
    /// Pick the strategy for a target's budget mode and the media on hand.
    ///
    /// A single video always wins. Multiple videos become separate ads under
    /// ABO; under CBO only the first video is used. Multiple images become a
    /// carousel under CBO and separate ads under ABO.
    pub fn select(budget_mode: BudgetMode, creative: &CreativeAssets) -> Self {
        let videos = creative.video_urls.len();
        let images = creative.image_urls.len();

        match (budget_mode, videos, images) {
            (_, 1, _) => AdCreationStrategy::SingleVideo,
            (BudgetMode::Abo, v, _) if v > 1 => AdCreationStrategy::MultipleAds,
            (BudgetMode::Cbo, v, _) if v > 1 => AdCreationStrategy::SingleVideo,
            (BudgetMode::Cbo, 0, i) if i > 1 => AdCreationStrategy::Carousel,
            (BudgetMode::Abo, 0, i) if i > 1 => AdCreationStrategy::MultipleAds,
            _ => AdCreationStrategy::SingleImage,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AdCreationStrategy::SingleImage => "single_image",
            AdCreationStrategy::SingleVideo => "single_video",
            AdCreationStrategy::Carousel => "carousel",
            AdCreationStrategy::MultipleAds => "multiple_ads",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedMedia {
    pub image_urls: Vec<String>,
    pub video_urls: Vec<String>,
}

/// The media a strategy actually uploads.
pub fn select_media(strategy: AdCreationStrategy, creative: &CreativeAssets) -> SelectedMedia {
    let first = |urls: &[String]| urls.iter().take(1).cloned().collect::<Vec<_>>();

    match strategy {
        AdCreationStrategy::SingleImage => SelectedMedia {
            image_urls: first(&creative.image_urls),
            video_urls: Vec::new(),
        },
        AdCreationStrategy::SingleVideo => SelectedMedia {
            image_urls: Vec::new(),
            video_urls: first(&creative.video_urls),
        },
        AdCreationStrategy::Carousel => SelectedMedia {
            image_urls: creative.image_urls.clone(),
            video_urls: Vec::new(),
        },
        AdCreationStrategy::MultipleAds if creative.video_urls.len() > 1 => SelectedMedia {
            image_urls: Vec::new(),
            video_urls: creative.video_urls.clone(),
        },
        AdCreationStrategy::MultipleAds => SelectedMedia {
            image_urls: creative.image_urls.clone(),
            video_urls: Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creative(images: usize, videos: usize) -> CreativeAssets {
        CreativeAssets {
            headline: "h".to_string(),
            primary_text: "t".to_string(),
            description: None,
            call_to_action: None,
            image_urls: (0..images).map(|i| format!("img{}", i)).collect(),
            video_urls: (0..videos).map(|i| format!("vid{}", i)).collect(),
        }
    }

    #[test]
    fn test_single_video_wins() {
        for mode in [BudgetMode::Cbo, BudgetMode::Abo] {
            assert_eq!(
                AdCreationStrategy::select(mode, &creative(3, 1)),
                AdCreationStrategy::SingleVideo
            );
        }
    }

    #[test]
    fn test_multiple_videos() {
        assert_eq!(
            AdCreationStrategy::select(BudgetMode::Abo, &creative(0, 3)),
            AdCreationStrategy::MultipleAds
        );
        assert_eq!(
            AdCreationStrategy::select(BudgetMode::Cbo, &creative(0, 3)),
            AdCreationStrategy::SingleVideo
        );
    }

    #[test]
    fn test_multiple_images() {
        assert_eq!(
            AdCreationStrategy::select(BudgetMode::Cbo, &creative(4, 0)),
            AdCreationStrategy::Carousel
        );
        assert_eq!(
            AdCreationStrategy::select(BudgetMode::Abo, &creative(4, 0)),
            AdCreationStrategy::MultipleAds
        );
        assert_eq!(
            AdCreationStrategy::select(BudgetMode::Cbo, &creative(1, 0)),
            AdCreationStrategy::SingleImage
        );
    }

    #[test]
    fn test_media_for_strategy() {
        let assets = creative(3, 2);

        let abo = select_media(AdCreationStrategy::MultipleAds, &assets);
        assert_eq!(abo.video_urls, vec!["vid0", "vid1"]);
        assert!(abo.image_urls.is_empty());

        let cbo = select_media(AdCreationStrategy::SingleVideo, &assets);
        assert_eq!(cbo.video_urls, vec!["vid0"]);

        let carousel = select_media(AdCreationStrategy::Carousel, &creative(3, 0));
        assert_eq!(carousel.image_urls.len(), 3);

        let single = select_media(AdCreationStrategy::SingleImage, &creative(3, 0));
        assert_eq!(single.image_urls, vec!["img0"]);
    }
}
