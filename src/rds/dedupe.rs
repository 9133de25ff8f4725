//! Virtual-host name and domain deduplication.
//!
//! Within one route table no two virtual hosts may share a name and no
//! domain string may appear in more than one virtual host. [`DedupeState`]
//! tracks what has been claimed during one synthesis run; a fresh instance
//! is created per assembled route table and discarded afterwards.

use std::collections::HashSet;

/// Claim tracking for one route-table assembly
#[derive(Debug, Default)]
pub struct DedupeState {
    virtual_host_names: HashSet<String>,
    domains: HashSet<String>,
    known_fqdns: HashSet<String>,
}

impl DedupeState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a virtual-host name. Returns true when the name was already
    /// claimed by an earlier virtual host in this assembly.
    pub fn claim_name(&mut self, name: &str) -> bool {
        !self.virtual_host_names.insert(name.to_string())
    }

    /// Index a fully-qualified name known to belong to a real service in
    /// this assembly. Must happen for every service before any domain
    /// filtering so the expansion guard can see all of them.
    pub fn index_known_fqdn<S: Into<String>>(&mut self, name: S) {
        self.known_fqdns.insert(name.into());
    }

    /// Filter candidate domains in order, claiming the survivors.
    ///
    /// A candidate is dropped when an earlier virtual host already claimed
    /// it, or when it is an expanded alt-host form that simultaneously equals
    /// a known fully-qualified name of some service in the same assembly —
    /// a wildcard-expansion artifact like `foo.com.cluster.local` shortening
    /// to `foo.com` must not shadow the real `foo.com`. Returns the
    /// order-preserving survivors and whether anything was dropped.
    pub fn dedupe_domains(
        &mut self,
        domains: Vec<String>,
        expanded_hosts: &[String],
    ) -> (Vec<String>, bool) {
        let mut kept = Vec::with_capacity(domains.len());
        let mut dropped = false;
        for domain in domains {
            if self.domains.contains(&domain) {
                dropped = true;
                continue;
            }
            // Linear scan; the expanded list holds at most a handful of hosts.
            if expanded_hosts.iter().any(|h| *h == domain) && self.known_fqdns.contains(&domain) {
                dropped = true;
                continue;
            }
            self.domains.insert(domain.clone());
            kept.push(domain);
        }
        (kept, dropped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_claim_name_reports_duplicates() {
        let mut state = DedupeState::new();
        assert!(!state.claim_name("reviews.team-a:9080"));
        assert!(state.claim_name("reviews.team-a:9080"));
        assert!(!state.claim_name("ratings.team-a:9080"));
    }

    #[test]
    fn test_claimed_domains_are_dropped_for_later_hosts() {
        let mut state = DedupeState::new();
        let (first, dropped) = state.dedupe_domains(strings(&["a.com", "a.com:80"]), &[]);
        assert_eq!(first, strings(&["a.com", "a.com:80"]));
        assert!(!dropped);

        let (second, dropped) = state.dedupe_domains(strings(&["a.com", "b.com"]), &[]);
        assert_eq!(second, strings(&["b.com"]));
        assert!(dropped);
    }

    #[test]
    fn test_expansion_guard_protects_known_fqdns() {
        let mut state = DedupeState::new();
        state.index_known_fqdn("foo.com");
        state.index_known_fqdn("foo.com:80");

        // "foo.com" arrived as an expansion of foo.com.cluster.local; the
        // real foo.com service must keep its name.
        let expanded = strings(&["foo.com", "foo.com:80"]);
        let (kept, dropped) =
            state.dedupe_domains(strings(&["foo.com.cluster.local", "foo.com"]), &expanded);
        assert_eq!(kept, strings(&["foo.com.cluster.local"]));
        assert!(dropped);
    }

    #[test]
    fn test_expanded_but_unknown_domain_is_kept() {
        let mut state = DedupeState::new();
        let expanded = strings(&["foo.com"]);
        let (kept, dropped) = state.dedupe_domains(strings(&["foo.com"]), &expanded);
        assert_eq!(kept, strings(&["foo.com"]));
        assert!(!dropped);
    }
}
