use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use feature_ml::ranking::{AllPairsLoss, HingeLoss, LossRequest, MostViolatedPairLoss, RankingLoss};
use feature_ml::{DenseVector, FeatureDictionary, FeatureGenerator, LazyVector};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::rc::Rc;

fn random_example(rng: &mut StdRng, n: usize, levels: usize) -> (Vec<f64>, Vec<f64>) {
    let scores = (0..n).map(|_| rng.gen_range(-3.0..3.0)).collect();
    let costs = (0..n).map(|_| rng.gen_range(0..levels) as f64).collect();
    (scores, costs)
}

fn bench_all_pairs(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let loss = AllPairsLoss::new(Box::new(HingeLoss::default()));
    let mut group = c.benchmark_group("all_pairs_gradient");

    for &(n, levels) in &[(200, 2), (1000, 2), (400, 200)] {
        let (scores, costs) = random_example(&mut rng, n, levels);
        let label = format!("{}x{}", n, levels);
        group.bench_with_input(BenchmarkId::new("fast", &label), &(), |b, _| {
            b.iter(|| loss.gradient(black_box(&scores), black_box(&costs)))
        });
        group.bench_with_input(BenchmarkId::new("brute_force", &label), &(), |b, _| {
            b.iter(|| {
                loss.brute_force(black_box(&scores), black_box(&costs), LossRequest::Gradient)
            })
        });
    }
    group.finish();
}

fn bench_most_violated_pair(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(11);
    let loss = MostViolatedPairLoss::new(Box::new(HingeLoss::default()));
    let (scores, costs) = random_example(&mut rng, 1000, 2);

    c.bench_function("most_violated_pair_fast", |b| {
        b.iter(|| loss.most_violated_pair(black_box(&scores), black_box(&costs)))
    });
    c.bench_function("most_violated_pair_brute_force", |b| {
        b.iter(|| loss.brute_force_pair(black_box(&scores), black_box(&costs)))
    });
}

fn bench_lazy_sum(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(3);
    let dictionary = FeatureDictionary::new("bench");
    let terms: Vec<Rc<DenseVector>> = (0..32)
        .map(|_| {
            let mut vector = DenseVector::with_values(dictionary.clone(), vec![0.0; 512]);
            for value in vector.values_mut() {
                *value = rng.gen_range(-1.0..1.0);
            }
            Rc::new(vector)
        })
        .collect();
    let parameters = DenseVector::with_values(dictionary.clone(), vec![0.5; 512]);

    c.bench_function("lazy_sum_dot_product", |b| {
        b.iter(|| {
            let mut sum = LazyVector::new(dictionary.clone());
            for (index, term) in terms.iter().enumerate() {
                sum.add_weighted(term.clone(), index as f64);
            }
            black_box(sum.dot_product(&parameters))
        })
    });
}

criterion_group!(benches, bench_all_pairs, bench_most_violated_pair, bench_lazy_sum);
criterion_main!(benches);
