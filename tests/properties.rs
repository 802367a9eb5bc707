use interbank_contagion::balance_sheet::{BalanceSheet, BalanceSheetParams};
use interbank_contagion::cascade::{simulate, CascadeSimulator, Shock};
use interbank_contagion::energy::{EnergyModel, Target, TargetSpec};
use interbank_contagion::graph::Graph;
use interbank_contagion::metrics::Metric;
use interbank_contagion::mutation::{Locality, Mutator};
use interbank_contagion::{AnnealingConfig, AnnealingSynthesizer};
use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn arb_graph() -> impl Strategy<Value = Graph> {
    (1_usize..12, any::<bool>(), prop::collection::vec((0_usize..12, 0_usize..12), 0..40))
        .prop_map(|(n, directed, pairs)| {
            let mut g = Graph::new(n, directed);
            for (u, v) in pairs {
                g.add_edge(u % n, v % n);
            }
            g
        })
}

fn full_model() -> EnergyModel {
    EnergyModel::new(
        TargetSpec::new(vec![
            Target::new(Metric::Density(0.3), 1.0),
            Target::new(Metric::Clustering(0.4), 0.7),
            Target::new(Metric::AveragePathLength(2.0), 1.2),
            Target::new(Metric::Components(1.0), 1.0),
            Target::new(Metric::Communities(2.0), 0.5),
            Target::new(
                Metric::Modularity {
                    clusters: 2,
                    target: 0.3,
                },
                0.9,
            ),
        ])
        .unwrap(),
    )
}

fn assert_simple(g: &Graph) {
    for (u, v) in g.edges() {
        assert_ne!(u, v);
        assert!(u < g.vertex_count() && v < g.vertex_count());
    }
    let mut edges = g.edges();
    let before = edges.len();
    edges.dedup();
    assert_eq!(edges.len(), before);
    assert_eq!(before, g.edge_count());
}

proptest! {
    #[test]
    fn energy_stays_in_unit_interval(g in arb_graph()) {
        let e = full_model().energy(&g);
        prop_assert!((0.0..=1.0).contains(&e));
    }

    #[test]
    fn mutations_keep_graph_simple(g in arb_graph(), seed in any::<u64>(), count in 0_usize..6) {
        let mut g = g;
        let vertices = g.vertex_count();
        let directed = g.is_directed();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mutator = Mutator::default();
        for locality in [None, Some(Locality::Local), Some(Locality::Global)] {
            mutator.mutate(&mut g, count, locality, &mut rng);
            prop_assert_eq!(g.vertex_count(), vertices);
            prop_assert_eq!(g.is_directed(), directed);
            assert_simple(&g);
        }
    }

    #[test]
    fn graph_json_round_trips(g in arb_graph()) {
        let json = serde_json::to_string(&g).unwrap();
        let back: Graph = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, g);
    }

    #[test]
    fn external_assets_sum_to_total(
        g in arb_graph(),
        e in 1.0_f64..1e6,
        gamma in 0.001_f64..0.5,
        theta in 0.01_f64..0.99,
    ) {
        let params = BalanceSheetParams { external_assets: e, gamma, theta };
        let sheet = BalanceSheet::build(&g, &params).unwrap();
        prop_assert!((sheet.external_assets().sum() - e).abs() <= 1e-9 * e.max(1.0));
    }

    #[test]
    fn zero_shock_never_defaults(g in arb_graph(), node in 0_usize..12) {
        let sheet = BalanceSheet::build(&g, &BalanceSheetParams::default()).unwrap();
        let node = node % sheet.banks();
        prop_assert_eq!(simulate(&sheet, 0.0, node).unwrap(), 0);
    }

    #[test]
    fn defaults_bounded_by_bank_count(g in arb_graph(), shock in 0.0_f64..1e6, node in 0_usize..12) {
        let sheet = BalanceSheet::build(&g, &BalanceSheetParams::default()).unwrap();
        let node = node % sheet.banks();
        let outcome = CascadeSimulator::new(&sheet).run(Shock { size: shock, node }).unwrap();
        prop_assert!(outcome.defaults <= sheet.banks());
        prop_assert!((0.0..=1.0).contains(&outcome.default_fraction()));
    }

    #[test]
    fn same_seed_same_synthesis(seed in any::<u64>()) {
        let config = AnnealingConfig { max_iterations: 60, ..AnnealingConfig::default() };
        let run = || {
            AnnealingSynthesizer::new(full_model(), config.clone(), seed).run(Graph::directed(8))
        };
        let (a, b) = (run(), run());
        prop_assert_eq!(a.graph, b.graph);
        prop_assert_eq!(a.energy, b.energy);
        prop_assert_eq!(a.iterations, b.iterations);
    }
}
