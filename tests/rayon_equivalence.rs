#![cfg(feature = "rayon")]

use iconmatch::lowlevel::locate_fixed;
use iconmatch::{
    Biome, Frame, FrameContext, GridConfig, RecognitionConfig, Recognizer, RgbaImageBuf,
    TemplateGeometry, TemplateLibrary, TemplateMeta,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn noise_icon(rng: &mut StdRng) -> RgbaImageBuf {
    let mut img = RgbaImageBuf::filled(40, 40, [0, 0, 0, 255]).unwrap();
    for y in 0..40 {
        for x in 0..40 {
            img.put(x, y, [rng.random(), rng.random(), rng.random(), 255]);
        }
    }
    img
}

#[test]
fn parallel_batch_matches_sequential() {
    let mut rng = StdRng::seed_from_u64(123);
    let icons: Vec<RgbaImageBuf> = (0..12).map(|_| noise_icon(&mut rng)).collect();
    let mut builder = TemplateLibrary::builder(TemplateGeometry::default());
    for (i, icon) in icons.iter().enumerate() {
        builder
            .add_icon(TemplateMeta::new(format!("item_{i}")), icon.view())
            .unwrap();
    }
    let lib = builder.build();

    let slots = locate_fixed(1280, 720, &GridConfig::default());
    let frames: Vec<RgbaImageBuf> = (0..8)
        .map(|f| {
            let mut frame = RgbaImageBuf::filled(1280, 720, [30, 30, 30, 255]).unwrap();
            for k in 0..=f {
                let icon = &icons[(f * 5 + k) % icons.len()];
                let slot = slots[(k * 7 + f) % slots.len()];
                frame.blit(icon.view(), slot.x, slot.y);
            }
            frame
        })
        .collect();
    let contexts = [
        FrameContext::default(),
        FrameContext::with_biome(Biome::Hell, 0.9),
    ];
    let batch: Vec<Frame<'_>> = frames
        .iter()
        .enumerate()
        .map(|(i, frame)| Frame {
            image: frame.view(),
            context: &contexts[i % 2],
        })
        .collect();

    let recognizer = Recognizer::new(&lib, RecognitionConfig::default()).unwrap();
    let parallel = recognizer.recognize_batch(&batch);
    let sequential: Vec<_> = batch
        .iter()
        .map(|frame| recognizer.recognize(frame.image, frame.context))
        .collect();

    assert_eq!(parallel.len(), frames.len());
    assert_eq!(parallel, sequential);
    assert!(parallel.iter().all(|r| !r.detections.is_empty()));
}
