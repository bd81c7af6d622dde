//! Saved research defaults

use anyhow::Result;
use contentflow_engine::ResearchDefaults;
use contentflow_engine::profile::ProfileStore;

use super::common::CommandEnv;

pub fn execute_profile_show_command(env: &CommandEnv) -> Result<()> {
    let profile = env.profile_store().get(env.user_id())?;
    let effective = ResearchDefaults::resolve(profile.as_ref(), &env.config.profile);

    println!("Research defaults for {}:", env.user_id());
    println!("  language:     {}", effective.language);
    println!("  country:      {}", effective.country);
    println!("  content type: {}", effective.content_type);
    println!("  depth:        {}", display_or_dash(effective.depth));
    println!("  limit:        {}", display_or_dash(effective.limit));
    if profile.is_none() {
        println!("(no saved profile; showing config and built-in defaults)");
    }
    Ok(())
}

/// Merge the given values into the saved profile.
pub fn execute_profile_set_command(
    env: &CommandEnv,
    language: Option<String>,
    country: Option<String>,
    depth: Option<u32>,
    limit: Option<u32>,
) -> Result<()> {
    let store = env.profile_store();
    let mut profile = store.get(env.user_id())?.unwrap_or_default();

    if language.is_some() {
        profile.language = language;
    }
    if country.is_some() {
        profile.country = country;
    }
    if depth.is_some() {
        profile.research_depth = depth;
    }
    if limit.is_some() {
        profile.research_limit = limit;
    }

    store.set(env.user_id(), profile)?;
    println!("Saved research defaults to {}", store.path());
    Ok(())
}

fn display_or_dash(value: Option<u32>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}
