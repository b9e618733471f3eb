//! Property-Based Tests
//!
//! Invariants of the policy engines checked over randomized inputs.
//! Uses a small seeded generator instead of an external crate so every
//! failure is reproducible from the seed.
//!
//! ## Invariants Tested
//!
//! - Version ordering is antisymmetric and transitive
//! - The running kernel is never scheduled for removal
//! - keep and remove partition the installed kernels
//! - Nothing is removed while the set fits the retention count
//! - The reboot verdict is deterministic and only rules set `required`

use std::cmp::Ordering;
use std::collections::BTreeSet;
use steward_common::{
    compare_versions, evaluate, plan, InstalledKernelSet, KernelIdentifier, RebootSignals,
};

// ============================================================================
// TEST HELPERS
// ============================================================================

/// xorshift64 generator for test inputs
struct TestRng {
    state: u64,
}

impl TestRng {
    fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 1 } else { seed },
        }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_range(&mut self, min: u64, max: u64) -> u64 {
        if max <= min {
            return min;
        }
        min + (self.next_u64() % (max - min))
    }

    fn next_bool(&mut self) -> bool {
        self.next_u64() & 1 == 1
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.next_range(0, items.len() as u64) as usize]
    }
}

/// Version-like strings mixing numeric runs, flavours and odd separators
fn random_version(rng: &mut TestRng) -> String {
    const FLAVOURS: &[&str] = &["amd64", "arm64", "generic", "rc1", "cloud", "rt", "00"];
    let parts = rng.next_range(1, 6);
    let mut out = String::new();
    for i in 0..parts {
        if i > 0 {
            out.push(if rng.next_bool() { '.' } else { '-' });
        }
        if rng.next_range(0, 4) == 0 {
            out.push_str(rng.pick(FLAVOURS));
        } else {
            out.push_str(&rng.next_range(0, 120).to_string());
        }
    }
    out
}

/// Debian-style kernel release
fn random_release(rng: &mut TestRng) -> String {
    format!(
        "{}.{}.0-{}-amd64",
        rng.next_range(4, 7),
        rng.next_range(0, 20),
        rng.next_range(1, 200)
    )
}

fn random_kernel_set(rng: &mut TestRng) -> (Vec<String>, String) {
    let count = rng.next_range(0, 9);
    let installed: Vec<String> = (0..count).map(|_| random_release(rng)).collect();
    let running = if !installed.is_empty() && rng.next_range(0, 5) != 0 {
        installed[rng.next_range(0, installed.len() as u64) as usize].clone()
    } else {
        random_release(rng)
    };
    (installed, running)
}

// ============================================================================
// Version ordering
// ============================================================================

mod version_properties {
    use super::*;

    #[test]
    fn test_prop_version_antisymmetric() {
        let mut rng = TestRng::new(7);
        for _ in 0..2000 {
            let a = random_version(&mut rng);
            let b = random_version(&mut rng);
            assert_eq!(
                compare_versions(&a, &b),
                compare_versions(&b, &a).reverse(),
                "antisymmetry broken for {} / {}",
                a,
                b
            );
        }
    }

    #[test]
    fn test_prop_version_transitive() {
        let mut rng = TestRng::new(42);
        for _ in 0..3000 {
            let a = random_version(&mut rng);
            let b = random_version(&mut rng);
            let c = random_version(&mut rng);
            let ab = compare_versions(&a, &b);
            let bc = compare_versions(&b, &c);
            if ab == Ordering::Less && bc == Ordering::Less {
                assert_eq!(
                    compare_versions(&a, &c),
                    Ordering::Less,
                    "transitivity broken: {} < {} < {}",
                    a,
                    b,
                    c
                );
            }
            if ab != Ordering::Greater && bc != Ordering::Greater {
                assert_ne!(compare_versions(&a, &c), Ordering::Greater);
            }
        }
    }

    #[test]
    fn test_prop_sort_is_consistent() {
        let mut rng = TestRng::new(99);
        for _ in 0..200 {
            let mut ids: Vec<KernelIdentifier> = (0..20)
                .map(|_| KernelIdentifier::new(random_version(&mut rng)))
                .collect();
            ids.sort();
            for pair in ids.windows(2) {
                assert_ne!(pair[0].cmp(&pair[1]), Ordering::Greater);
            }
        }
    }

    #[test]
    fn test_prop_increasing_releases_sort_in_order() {
        let releases: Vec<String> = (1..=150).map(|n| format!("6.1.0-{}-amd64", n)).collect();
        for pair in releases.windows(2) {
            assert_eq!(compare_versions(&pair[0], &pair[1]), Ordering::Less);
        }
    }
}

// ============================================================================
// Kernel retention
// ============================================================================

mod retention_properties {
    use super::*;

    #[test]
    fn test_prop_running_kernel_never_removed() {
        let mut rng = TestRng::new(1234);
        for _ in 0..2000 {
            let (installed, running) = random_kernel_set(&mut rng);
            let keep = rng.next_range(1, 6) as usize;
            let set = InstalledKernelSet::new(installed.iter().map(String::as_str), running.as_str());
            let result = plan(&set, keep).unwrap();
            let running_id = KernelIdentifier::new(&running);

            assert!(!result.remove.contains(&running_id));
            if set.lists_running() {
                assert!(result.keep.contains(&running_id), "running {} dropped", running);
            }
        }
    }

    #[test]
    fn test_prop_keep_and_remove_partition_installed() {
        let mut rng = TestRng::new(5678);
        for _ in 0..2000 {
            let (installed, running) = random_kernel_set(&mut rng);
            let keep = rng.next_range(1, 6) as usize;
            let set = InstalledKernelSet::new(installed.iter().map(String::as_str), running.as_str());
            let result = plan(&set, keep).unwrap();

            assert!(result.keep.is_disjoint(&result.remove));

            let union: BTreeSet<KernelIdentifier> =
                result.keep.union(&result.remove).cloned().collect();
            assert_eq!(&union, set.installed());
        }
    }

    #[test]
    fn test_prop_small_sets_untouched() {
        let mut rng = TestRng::new(31337);
        for _ in 0..1000 {
            let (installed, running) = random_kernel_set(&mut rng);
            let set = InstalledKernelSet::new(installed.iter().map(String::as_str), running.as_str());
            let keep = set.len().max(1) + rng.next_range(0, 3) as usize;
            let result = plan(&set, keep).unwrap();
            assert!(result.remove.is_empty(), "removed from a set of {}", set.len());
            assert_eq!(&result.keep, set.installed());
        }
    }

    #[test]
    fn test_prop_keep_size_bounds() {
        let mut rng = TestRng::new(2024);
        for _ in 0..2000 {
            let (installed, running) = random_kernel_set(&mut rng);
            let keep = rng.next_range(1, 6) as usize;
            let set = InstalledKernelSet::new(installed.iter().map(String::as_str), running.as_str());
            let result = plan(&set, keep).unwrap();
            if set.is_empty() {
                continue;
            }
            assert!(result.keep.is_subset(set.installed()));
            assert!(result.keep.len() >= keep.min(set.len()));
            assert!(result.keep.len() <= keep + 1);
        }
    }

    #[test]
    fn test_end_to_end_old_running_kernel() {
        let set = InstalledKernelSet::new(
            ["5.15.0-10", "5.15.0-20", "5.15.0-30", "5.15.0-40"],
            "5.15.0-10",
        );
        let result = plan(&set, 3).unwrap();
        for id in ["5.15.0-10", "5.15.0-30", "5.15.0-40"] {
            assert!(result.keep.contains(&KernelIdentifier::new(id)), "{} not kept", id);
        }
        assert!(result.remove.contains(&KernelIdentifier::new("5.15.0-20")));
    }
}

// ============================================================================
// Reboot inference
// ============================================================================

mod reboot_properties {
    use super::*;

    fn random_signals(rng: &mut TestRng) -> RebootSignals {
        let kernel = |rng: &mut TestRng| {
            if rng.next_range(0, 3) == 0 {
                None
            } else {
                Some(format!("6.1.0-{}", rng.next_range(9, 12)))
            }
        };
        RebootSignals {
            pending_reboot_marker_present: rng.next_bool(),
            failed_service_count: rng.next_range(0, 4) as u32,
            running_kernel_version: kernel(rng),
            expected_kernel_version: kernel(rng),
            services_needing_restart: rng.next_range(0, 10) as u32,
            critical_library_flag_set: rng.next_bool(),
            upgrade_occurred_this_session: rng.next_bool(),
        }
    }

    #[test]
    fn test_prop_required_iff_a_rule_fired() {
        let mut rng = TestRng::new(77);
        for _ in 0..2000 {
            let signals = random_signals(&mut rng);
            let verdict = evaluate(&signals);
            assert_eq!(verdict.required, !verdict.reasons.is_empty());
            assert_eq!(verdict, evaluate(&signals));
        }
    }

    #[test]
    fn test_prop_service_counts_never_decide() {
        let mut rng = TestRng::new(88);
        for _ in 0..2000 {
            let mut signals = random_signals(&mut rng);
            let baseline = evaluate(&signals).required;
            signals.failed_service_count = rng.next_range(0, 50) as u32;
            signals.services_needing_restart = rng.next_range(0, 50) as u32;
            assert_eq!(evaluate(&signals).required, baseline);
        }
    }

    #[test]
    fn test_prop_stale_flag_never_fires() {
        let mut rng = TestRng::new(99);
        for _ in 0..2000 {
            let mut signals = random_signals(&mut rng);
            signals.upgrade_occurred_this_session = false;
            let with_flag = {
                signals.critical_library_flag_set = true;
                evaluate(&signals).required
            };
            signals.critical_library_flag_set = false;
            assert_eq!(with_flag, evaluate(&signals).required);
        }
    }
}
