//! Enumeration and round benchmarks using Criterion.
//!
//! Run with: `cargo bench`
//!
//! - Raw pattern enumeration at increasing depth
//! - Matching enumerated patterns against a ground model
//! - A complete conjecture round over Peano addition

use conjgen::congruence::CongruenceClosure;
use conjgen::enumerate::{
    AcceptAll, ClassFilter, EnumEnv, FunctionUniverse, MatchBinding, MatchMode, TermEnumerator,
};
use conjgen::lemma::{Assertion, CaseSplit, Conjecture, Effort, ProofHost};
use conjgen::model::ModelIndex;
use conjgen::symbol::{FuncId, SortId, SymbolStore};
use conjgen::term::{FuncKind, TermId, TermStore};
use conjgen::{ConjectureConfig, ConjectureEngine};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

struct Peano {
    symbols: SymbolStore,
    terms: TermStore,
    nat: SortId,
    z: FuncId,
    s: FuncId,
    plus: FuncId,
}

impl Peano {
    fn new() -> Self {
        let symbols = SymbolStore::new();
        let terms = TermStore::new();
        let nat = symbols.sort("Nat");
        let z = symbols.intern("Z");
        let s = symbols.intern("S");
        let plus = symbols.intern("plus");
        terms.declare(z, &[], nat, FuncKind::Constructor);
        terms.declare(s, &[nat], nat, FuncKind::Constructor);
        terms.declare(plus, &[nat, nat], nat, FuncKind::Uninterpreted);
        Self {
            symbols,
            terms,
            nat,
            z,
            s,
            plus,
        }
    }

    fn num(&self, n: u32) -> TermId {
        (0..n).fold(self.terms.app0(self.z), |t, _| self.terms.app1(self.s, t))
    }

    /// `plus` evaluated on numerals below `n`, plus a skolem `k` with
    /// `plus(k, Z) = k`.
    fn model(&self, n: u32) -> CongruenceClosure {
        let mut cc = CongruenceClosure::new();
        for a in 0..n {
            for b in 0..n {
                let sum = self.terms.app2(self.plus, self.num(a), self.num(b));
                cc.assert_equal(sum, self.num(a + b), &self.terms);
            }
        }
        let k = self.symbols.intern("k");
        self.terms.declare(k, &[], self.nat, FuncKind::Skolem);
        let tk = self.terms.app0(k);
        cc.assert_equal(self.terms.app2(self.plus, tk, self.num(0)), tk, &self.terms);
        cc
    }

    fn universe(&self) -> FunctionUniverse {
        let mut u = FunctionUniverse::new();
        for f in [self.z, self.s, self.plus] {
            if let Some(sig) = self.terms.signature(f) {
                u.add(f, &sig);
            }
        }
        u
    }
}

#[derive(Default)]
struct SilentHost {
    lemmas: usize,
}

impl ProofHost for SilentHost {
    fn assertions(&self) -> Vec<Assertion> {
        Vec::new()
    }

    fn has_pending_lemmas(&self) -> bool {
        false
    }

    fn deactivate(&mut self, _index: usize) {}

    fn add_lemma(&mut self, _lemma: CaseSplit) {
        self.lemmas += 1;
    }

    fn require_phase(&mut self, _conjecture: &Conjecture, _phase: bool) {}
}

/// Benchmark unfiltered enumeration of every pattern up to a depth.
fn bench_enumerate_depth(c: &mut Criterion) {
    let p = Peano::new();
    let universe = p.universe();
    let model = ModelIndex::default();
    let env = EnumEnv {
        terms: &p.terms,
        universe: &universe,
        model: &model,
        filter: ClassFilter::inactive(),
    };

    let mut group = c.benchmark_group("enumerate_depth");
    for depth in [1u32, 2, 3] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| {
                let mut en = TermEnumerator::new();
                en.set_variable_budget(p.nat, 0, Some(3));
                en.start(Some(p.nat));
                let mut count = 0usize;
                while en.next_term(depth, &env, &mut AcceptAll) {
                    count += 1;
                }
                black_box(count)
            })
        });
    }
    group.finish();
}

/// Benchmark matching every depth-1 pattern against every class.
fn bench_match_classes(c: &mut Criterion) {
    let p = Peano::new();
    let cc = p.model(4);
    let index = ModelIndex::build(&cc, &p.terms);
    let universe = p.universe();
    let env = EnumEnv {
        terms: &p.terms,
        universe: &universe,
        model: &index,
        filter: ClassFilter::inactive(),
    };

    c.bench_function("match_classes", |b| {
        b.iter(|| {
            let mut en = TermEnumerator::new();
            en.set_variable_budget(p.nat, 0, Some(2));
            let root = en.start(Some(p.nat));
            let mut matches = 0usize;
            while en.next_term(1, &env, &mut AcceptAll) {
                for &class in index.classes() {
                    let mut binding = MatchBinding::new();
                    en.reset_matching(root, MatchMode::default());
                    while en.next_match(root, class, &mut binding, &env) {
                        matches += 1;
                    }
                }
            }
            black_box(matches)
        })
    });
}

/// Benchmark a whole round, from model snapshot to emitted lemmas.
fn bench_round(c: &mut Criterion) {
    let p = Peano::new();
    let cc = p.model(3);
    let config = ConjectureConfig {
        max_conjectures_per_round: 8,
        max_rhs_depth: 2,
        ..Default::default()
    };

    c.bench_function("conjecture_round", |b| {
        b.iter(|| {
            let mut engine = match ConjectureEngine::new(config.clone(), &p.symbols) {
                Ok(engine) => engine,
                Err(e) => panic!("invalid benchmark config: {}", e),
            };
            let mut host = SilentHost::default();
            engine.check(Effort::Full, &cc, &mut host, &p.terms);
            black_box(host.lemmas)
        })
    });
}

criterion_group!(benches, bench_enumerate_depth, bench_match_classes, bench_round);
criterion_main!(benches);
