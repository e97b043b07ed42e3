//! Deterministic sample observations for demos and smoke runs

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::observation::{
    AccessibilityIssue, BundleFile, ComponentRender, ErrorEvent, Observation, Rating, ResourceTiming,
    UsageCategory, UsageEvent, UserInteraction, WebVital,
};

const KB: u64 = 1024;

/// Standard web-vitals cut points: (good upper bound, poor lower bound)
const VITAL_CUT_POINTS: [(&str, f64, f64); 6] = [
    ("FCP", 1800.0, 3000.0),
    ("LCP", 2500.0, 4000.0),
    ("FID", 100.0, 300.0),
    ("CLS", 0.1, 0.25),
    ("TTFB", 800.0, 1800.0),
    ("TBT", 200.0, 600.0),
];

const COMPONENTS: [&str; 5] = ["Header", "ProductList", "ProductCard", "Cart", "Checkout"];
const FEATURES: [&str; 4] = ["search", "filters", "wishlist", "export"];
const PAGES: [&str; 4] = ["/", "/products", "/cart", "/checkout"];
const ACTIONS: [&str; 4] = ["click", "submit", "scroll", "keypress"];
const ERRORS: [(&str, &str); 5] = [
    ("network", "Failed to fetch /api/products"),
    ("network", "Request timed out"),
    ("runtime", "Cannot read properties of undefined"),
    ("render", "Maximum update depth exceeded"),
    ("validation", "Invalid postal code"),
];
const A11Y_RULES: [(&str, &str, &str); 4] = [
    ("color-contrast", "serious", "Elements must have sufficient color contrast"),
    ("image-alt", "critical", "Images must have alternate text"),
    ("label", "moderate", "Form elements must have labels"),
    ("region", "minor", "All page content should be contained by landmarks"),
];

/// Rate a vital by the standard cut points; unknown names get `None`
pub fn rate_vital(name: &str, value: f64) -> Option<Rating> {
    VITAL_CUT_POINTS
        .iter()
        .find(|(vital, _, _)| vital.eq_ignore_ascii_case(name))
        .map(|(_, good, poor)| {
            if value <= *good {
                Rating::Good
            } else if value <= *poor {
                Rating::NeedsImprovement
            } else {
                Rating::Poor
            }
        })
}

pub struct SampleGenerator {
    rng: StdRng,
}

impl SampleGenerator {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn generate(&mut self) -> Vec<Observation> {
        self.generate_at(Utc::now())
    }

    /// A full observation set with timestamps spread over the week before `now`
    pub fn generate_at(&mut self, now: DateTime<Utc>) -> Vec<Observation> {
        let mut observations = Vec::new();
        observations.extend(self.web_vitals(now));
        observations.extend(self.renders(now));
        observations.extend(self.resources(now));
        observations.extend(self.interactions(now));
        observations.extend(self.errors(now));
        observations.extend(self.accessibility_issues(now));
        observations.extend(self.bundle_files(now));
        observations.extend(self.usage_events(now));
        observations
    }

    fn recent(&mut self, now: DateTime<Utc>) -> DateTime<Utc> {
        now - Duration::minutes(self.rng.gen_range(0..7 * 24 * 60))
    }

    fn hash(&mut self) -> String {
        format!("{:08x}", self.rng.gen::<u32>())
    }

    fn web_vitals(&mut self, now: DateTime<Utc>) -> Vec<Observation> {
        let mut vitals = Vec::new();
        for (name, good, poor) in VITAL_CUT_POINTS {
            for _ in 0..5 {
                // mostly good, with a tail past the poor cut point
                let value = self.rng.gen_range(good * 0.4..poor * 1.2);
                let value = if name == "CLS" {
                    (value * 1000.0).round() / 1000.0
                } else {
                    value.round()
                };
                let rating = rate_vital(name, value).unwrap_or(Rating::Good);
                vitals.push(WebVital::new(name, value, rating).at(self.recent(now)).into());
            }
        }
        vitals
    }

    fn renders(&mut self, now: DateTime<Utc>) -> Vec<Observation> {
        let mut renders = Vec::new();
        for component in COMPONENTS {
            let base = self.rng.gen_range(2.0..14.0);
            for _ in 0..8 {
                let time: f64 = base + self.rng.gen_range(0.0..base);
                let time = (time * 10.0).round() / 10.0;
                renders.push(ComponentRender::new(component, time).at(self.recent(now)).into());
            }
        }
        renders
    }

    fn resources(&mut self, now: DateTime<Utc>) -> Vec<Observation> {
        let kinds = [("script", "js"), ("css", "css"), ("img", "png"), ("fetch", "json")];
        (0..20)
            .map(|i| {
                let (initiator, extension) = kinds[i % kinds.len()];
                let name = format!("/static/asset-{}.{}", i, extension);
                let duration = self.rng.gen_range(5.0..400.0_f64).round();
                let size = self.rng.gen_range(KB..200 * KB);
                ResourceTiming::new(name, initiator, duration, size).at(self.recent(now)).into()
            })
            .collect()
    }

    fn interactions(&mut self, now: DateTime<Utc>) -> Vec<Observation> {
        (0..15)
            .map(|_| {
                let action = ACTIONS[self.rng.gen_range(0..ACTIONS.len())];
                let response = self.rng.gen_range(10.0..250.0_f64).round();
                UserInteraction::new(action, response).at(self.recent(now)).into()
            })
            .collect()
    }

    fn errors(&mut self, now: DateTime<Utc>) -> Vec<Observation> {
        (0..12)
            .map(|_| {
                let (category, message) = ERRORS[self.rng.gen_range(0..ERRORS.len())];
                let mut context = Map::new();
                context.insert("route".to_string(), Value::from(PAGES[self.rng.gen_range(0..PAGES.len())]));
                context.insert("userId".to_string(), Value::from(self.rng.gen_range(1000..9999u32)));
                ErrorEvent::new(message, category)
                    .with_context(context)
                    .at(self.recent(now))
                    .into()
            })
            .collect()
    }

    fn accessibility_issues(&mut self, now: DateTime<Utc>) -> Vec<Observation> {
        let count = self.rng.gen_range(1..=4);
        (0..count)
            .map(|_| {
                let (id, impact, description) = A11Y_RULES[self.rng.gen_range(0..A11Y_RULES.len())];
                let nodes = self.rng.gen_range(1..6);
                AccessibilityIssue::new(id, impact, description, nodes).at(self.recent(now)).into()
            })
            .collect()
    }

    fn bundle_files(&mut self, now: DateTime<Utc>) -> Vec<Observation> {
        let files = [
            ("main", "js", 120 * KB..220 * KB),
            ("vendor", "js", 40 * KB..90 * KB),
            ("runtime", "js", 2 * KB..6 * KB),
            ("main", "css", 15 * KB..45 * KB),
        ];
        files
            .into_iter()
            .map(|(chunk, extension, range)| {
                let name = format!("{}.{}.{}", chunk, self.hash(), extension);
                BundleFile::new(name, self.rng.gen_range(range)).at(now).into()
            })
            .collect()
    }

    fn usage_events(&mut self, now: DateTime<Utc>) -> Vec<Observation> {
        let sessions: Vec<String> = (0..5)
            .map(|_| Uuid::from_u128(self.rng.gen()).to_string())
            .collect();

        (0..40)
            .map(|i| {
                let session = sessions[self.rng.gen_range(0..sessions.len())].clone();
                let (category, name) = match i % 4 {
                    0 => (UsageCategory::PageView, PAGES[self.rng.gen_range(0..PAGES.len())]),
                    1 => (UsageCategory::Component, COMPONENTS[self.rng.gen_range(0..COMPONENTS.len())]),
                    _ => (UsageCategory::Feature, FEATURES[self.rng.gen_range(0..FEATURES.len())]),
                };
                UsageEvent::new(category, name)
                    .in_session(session)
                    .at(self.recent(now))
                    .into()
            })
            .collect()
    }
}
