use std::collections::BTreeMap;

use tracing::debug;

/// Selects the entries of `process_env` whose key starts with one of `prefixes`.
///
/// Everything else in the caller's environment stays out of the remote container.
pub(crate) fn forwarded_env(
    process_env: impl IntoIterator<Item = (String, String)>,
    prefixes: &[&str],
) -> BTreeMap<String, String> {
    let forwarded: BTreeMap<String, String> = process_env
        .into_iter()
        .filter(|(key, _)| prefixes.iter().any(|prefix| key.starts_with(prefix)))
        .collect();
    debug!(
        "forwarding env to the job: {:?}",
        forwarded.keys().collect::<Vec<_>>()
    );
    forwarded
}
