//! Profile acceptance filter.
//!
//! A pure function of a [`Profile`] and the configured keyword sets. Each
//! keyword set stands for one language or script; sets are ORed together
//! and so are the keywords within a set. Matching is a case-insensitive
//! substring test against the biography. Exclusion always wins.

use crate::config::{FilterConfig, KeywordSets};
use crate::types::{FilterVerdict, Profile};

/// Evaluate a profile against include and exclude keyword sets, requiring
/// it to be public.
pub fn filter(profile: &Profile, include: &KeywordSets, exclude: &KeywordSets) -> FilterVerdict {
    ProfileFilter::new(&FilterConfig {
        require_public: true,
        min_followers: 0,
        include: include.clone(),
        exclude: exclude.clone(),
    })
    .evaluate(profile)
}

/// A keyword lowercased once, tagged with the set it came from.
#[derive(Debug, Clone)]
struct Keyword {
    set: String,
    needle: String,
}

/// Filter rules compiled from a [`FilterConfig`].
#[derive(Debug, Clone)]
pub struct ProfileFilter {
    require_public: bool,
    min_followers: u64,
    include: Vec<Keyword>,
    exclude: Vec<Keyword>,
}

impl ProfileFilter {
    /// Compile the filter, lowercasing keywords and dropping blank ones.
    pub fn new(config: &FilterConfig) -> Self {
        let include = compile(&config.include);
        if include.is_empty() {
            tracing::warn!("no include keywords configured, every profile will be rejected");
        }
        Self {
            require_public: config.require_public,
            min_followers: config.min_followers,
            include,
            exclude: compile(&config.exclude),
        }
    }

    /// Decide whether a profile is accepted.
    ///
    /// Checks run in order: privacy, follower floor, include keywords,
    /// exclude keywords. An empty include union matches nothing.
    pub fn evaluate(&self, profile: &Profile) -> FilterVerdict {
        if self.require_public && profile.is_private {
            return FilterVerdict::reject("private profile");
        }

        if profile.follower_count < self.min_followers {
            return FilterVerdict::reject(format!(
                "{} followers, below floor of {}",
                profile.follower_count, self.min_followers
            ));
        }

        let bio = profile.biography.to_lowercase();

        let Some(matched) = self.include.iter().find(|k| bio.contains(&k.needle)) else {
            return FilterVerdict::reject("no include keyword in biography");
        };

        if let Some(keyword) = self.exclude.iter().find(|k| bio.contains(&k.needle)) {
            return FilterVerdict::reject(format!(
                "excluded keyword '{}' ({})",
                keyword.needle, keyword.set
            ));
        }

        FilterVerdict::accept(format!("matched '{}' ({})", matched.needle, matched.set))
    }
}

fn compile(sets: &KeywordSets) -> Vec<Keyword> {
    sets.iter()
        .flat_map(|(set, words)| {
            words
                .iter()
                .map(|word| word.trim().to_lowercase())
                .filter(|needle| !needle.is_empty())
                .map(move |needle| Keyword {
                    set: set.clone(),
                    needle,
                })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sets(entries: &[(&str, &[&str])]) -> KeywordSets {
        entries
            .iter()
            .map(|(lang, words)| {
                (
                    (*lang).to_owned(),
                    words.iter().map(|w| (*w).to_owned()).collect(),
                )
            })
            .collect()
    }

    fn profile(bio: &str) -> Profile {
        Profile {
            identity: "someone".into(),
            biography: bio.into(),
            follower_count: 500,
            ..Default::default()
        }
    }

    #[test]
    fn include_match_passes() {
        let verdict = filter(
            &profile("DM for coaching"),
            &sets(&[("english", &["coach"])]),
            &KeywordSets::new(),
        );
        assert!(verdict.pass, "{}", verdict.reason);
        assert!(verdict.reason.contains("coach"));
    }

    #[test]
    fn exclude_wins_over_include() {
        let verdict = filter(
            &profile("musician and coach"),
            &sets(&[("english", &["coach"])]),
            &sets(&[("english", &["musician"])]),
        );
        assert!(!verdict.pass);
        assert!(verdict.reason.contains("musician"));
    }

    #[test]
    fn private_profiles_rejected() {
        let mut p = profile("online coach");
        p.is_private = true;
        let verdict = filter(&p, &sets(&[("english", &["coach"])]), &KeywordSets::new());
        assert!(!verdict.pass);
        assert_eq!(verdict.reason, "private profile");
    }

    #[test]
    fn missing_include_rejected() {
        let verdict = filter(
            &profile("photographer in Dubai"),
            &sets(&[("english", &["coach"])]),
            &KeywordSets::new(),
        );
        assert!(!verdict.pass);
        assert!(verdict.reason.contains("no include keyword"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let verdict = filter(
            &profile("Certified PERSONAL Trainer"),
            &sets(&[("english", &["personal trainer"])]),
            &KeywordSets::new(),
        );
        assert!(verdict.pass);
    }

    #[test]
    fn sets_are_ored_across_languages() {
        let include = sets(&[("english", &["coach"]), ("arabic", &["مدرب"])]);
        let verdict = filter(&profile("مدرب لياقة بدنية"), &include, &KeywordSets::new());
        assert!(verdict.pass);
        assert!(verdict.reason.contains("arabic"));
    }

    #[test]
    fn follower_floor_applies() {
        let rules = ProfileFilter::new(&FilterConfig {
            min_followers: 1_000,
            include: sets(&[("english", &["coach"])]),
            ..Default::default()
        });
        let verdict = rules.evaluate(&profile("coach"));
        assert!(!verdict.pass);
        assert!(verdict.reason.contains("below floor"));

        let mut popular = profile("coach");
        popular.follower_count = 1_000;
        assert!(rules.evaluate(&popular).pass);
    }

    #[test]
    fn private_allowed_when_not_required_public() {
        let rules = ProfileFilter::new(&FilterConfig {
            require_public: false,
            include: sets(&[("english", &["coach"])]),
            ..Default::default()
        });
        let mut p = profile("coach");
        p.is_private = true;
        assert!(rules.evaluate(&p).pass);
    }

    #[test]
    fn empty_include_union_rejects_everything() {
        let verdict = filter(
            &profile("just a chef"),
            &KeywordSets::new(),
            &KeywordSets::new(),
        );
        assert!(!verdict.pass);
        assert_eq!(verdict.reason, "no include keyword in biography");

        let only_blank = filter(
            &profile("coach"),
            &sets(&[("english", &[" "])]),
            &KeywordSets::new(),
        );
        assert!(!only_blank.pass);
    }

    #[test]
    fn blank_keywords_are_ignored() {
        let verdict = filter(
            &profile("photographer"),
            &sets(&[("english", &["  ", "coach"])]),
            &sets(&[("english", &[""])]),
        );
        assert!(!verdict.pass);
        assert!(verdict.reason.contains("no include keyword"));
    }
}
