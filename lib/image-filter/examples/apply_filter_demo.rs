/// Runs every catalog filter over one image
/// cargo run -p image-filter --example apply_filter_demo -- data/test.png

use image_filter::{FilterKind, FilterPipeline};
use std::path::Path;

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let input = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "data/test.png".to_string());
    let output_dir = Path::new("tmp");
    std::fs::create_dir_all(output_dir)?;

    let bytes = std::fs::read(&input)?;
    let pipeline = FilterPipeline::new().with_expand_gray(true);

    for kind in FilterKind::all() {
        let output = pipeline.run(kind.identifier(), &bytes)?;
        let path = output_dir.join(format!("{}.{}", output.filter, output.format.extension()));
        std::fs::write(&path, &output.bytes)?;

        println!("✓ {:<16} {}x{} -> {}", output.filter, output.width, output.height, path.display());
    }

    Ok(())
}
