use criterion::{black_box, criterion_group, criterion_main, Criterion};
use machina::dfa::Dfa;
use machina::gnfa::Gnfa;
use machina::nfa::Nfa;
use regex::Regex as LibRegex;

const ALPHABET: &[&str] = &["a", "b", "c", "d", "e", "f"];
const PATTERN: &str = "(a|b)*c(d|e|f)?(a|c)*|b(a|b)*";

fn counter() -> Dfa {
    Dfa::count_mod(ALPHABET, 7, Some(&[0, 3]), Some(&["a", "b"]))
        .unwrap()
        .intersection(&Dfa::from_substring(ALPHABET, "cafe", true).unwrap())
        .unwrap()
}

fn matcher() -> Dfa {
    Dfa::from_substrings(ALPHABET, &["abc", "fed", "cab"], true).unwrap()
}

pub fn powerset(c: &mut Criterion) {
    let lhs = counter();
    let rhs = matcher();
    c.bench_function("union", |b| b.iter(|| lhs.union(black_box(&rhs))));
    c.bench_function("intersection", |b| {
        b.iter(|| lhs.intersection(black_box(&rhs)))
    });
    c.bench_function("difference", |b| b.iter(|| lhs.difference(black_box(&rhs))));
    c.bench_function("symmetric difference", |b| {
        b.iter(|| lhs.symmetric_difference(black_box(&rhs)))
    });
}

pub fn minimization(c: &mut Criterion) {
    let product = counter().union(&matcher()).unwrap();
    c.bench_function("minimize", |b| {
        b.iter(|| black_box(&product).minimized(false))
    });
}

pub fn equivalence_check(c: &mut Criterion) {
    let lhs = counter();
    let rhs = matcher();
    c.bench_function("equivalence check", |b| {
        b.iter(|| lhs.equivalent_to(black_box(&rhs)))
    });
}

pub fn regex_compile(c: &mut Criterion) {
    c.bench_function("machina regex compile", |b| {
        b.iter(|| {
            Nfa::from_regex(black_box(PATTERN))
                .unwrap()
                .to_dfa()
                .minimized(false)
        })
    });

    c.bench_function("library regex compile", |b| {
        b.iter(|| LibRegex::new(black_box(PATTERN)).unwrap())
    });
}

pub fn regex_check(c: &mut Criterion) {
    let dfa = Nfa::from_regex(PATTERN).unwrap().to_dfa().minimized(false);
    let input = "ababbaabcacacaca";
    c.bench_function("machina regex check", |b| {
        b.iter(|| dfa.accepts_graphemes(black_box(input)))
    });

    let oracle = LibRegex::new(&format!("^(?:{PATTERN})$")).unwrap();
    c.bench_function("library regex check", |b| {
        b.iter(|| oracle.is_match(black_box(input)))
    });
}

pub fn state_elimination(c: &mut Criterion) {
    let dfa = matcher();
    c.bench_function("gnfa to regex", |b| {
        b.iter(|| Gnfa::from_dfa(black_box(&dfa)).to_regex())
    });
}

criterion_group!(
    benches,
    equivalence_check,
    powerset,
    minimization,
    regex_compile,
    regex_check,
    state_elimination
);
criterion_main!(benches);
