use criterion::{black_box, criterion_group, criterion_main, Criterion};
use dasp_signal::{self as signal, Signal};
use klangkette::{BandGains, Effect, EffectsChain, EngineConfig, Params, ProcessContext};

fn noise_block(len: usize) -> Vec<f32> {
    signal::noise(7).take(len).map(|s| (s * 0.8) as f32).collect()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let config = EngineConfig::default();
    let ctx = ProcessContext::new(44100, 2, config.block_size);
    let input = noise_block(ctx.block_size);

    c.bench_function("EffectsChain.process() neutral", |b| {
        let mut chain = EffectsChain::new(&ctx, &config);
        let params = Params::default();
        let mut block = input.clone();

        b.iter(|| {
            block.copy_from_slice(&input);
            chain.process(&ctx, black_box(&params), &mut block);
        })
    });

    c.bench_function("EffectsChain.process() boosted + ramping", |b| {
        let mut chain = EffectsChain::new(&ctx, &config);
        let mut params = Params {
            gains: BandGains::uniform(0.8),
            ..Params::default()
        };
        let mut block = input.clone();

        b.iter(|| {
            // alternate volumes so the gain stage interpolates every block
            params.volume = if params.volume > 0.5 { 0.4 } else { 0.9 };
            block.copy_from_slice(&input);
            chain.process(&ctx, black_box(&params), &mut block);
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
