use std::path::{Path, PathBuf};

use kptrack::{
    visualize, DescriptorType, DetectorType, Error, MatcherType, SelectorType, Tracker,
    TrackerConfig,
};
use log::*;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "kptrack",
    about = "Detects, describes and matches keypoints across a sequence of images"
)]
struct Opt {
    /// Keypoint detector: SHITOMASI, HARRIS, FAST, ORB or AKAZE.
    #[structopt(short, long, default_value = "SHITOMASI")]
    detector: DetectorType,
    /// Descriptor extractor: BRIEF, ORB or AKAZE.
    #[structopt(short = "D", long, default_value = "BRIEF")]
    descriptor: DescriptorType,
    /// Matcher: MAT_BF or MAT_FLANN.
    #[structopt(short, long, default_value = "MAT_BF")]
    matcher: MatcherType,
    /// Selector: SEL_NN or SEL_KNN.
    #[structopt(short, long, default_value = "SEL_KNN")]
    selector: SelectorType,
    /// Number of frames held in memory at the same time.
    #[structopt(short, long, default_value = "2")]
    buffer_size: usize,
    /// Lowe's ratio used by SEL_KNN.
    #[structopt(long, default_value = "0.8")]
    ratio: f32,
    /// Only keep matches that are mutual best matches.
    #[structopt(long)]
    cross_check: bool,
    /// Directory to write keypoint and match visualizations to.
    #[structopt(short, long, parse(from_os_str))]
    output_dir: Option<PathBuf>,
    /// The images to track, in order.
    #[structopt(parse(from_os_str), required = true)]
    images: Vec<PathBuf>,
}

fn main() -> Result<(), Error> {
    pretty_env_logger::init_timed();
    let opt = Opt::from_args();

    let mut config =
        TrackerConfig::new(opt.detector, opt.descriptor, opt.matcher, opt.selector);
    config.buffer_size = opt.buffer_size;
    config.matcher_config.ratio = opt.ratio;
    config.matcher_config.cross_check = opt.cross_check;
    debug!("{:?}", config);

    let mut tracker = Tracker::new(config)?;
    for path in &opt.images {
        let image = image::open(path)?.to_luma8();
        let frame = tracker.track(image)?;
        println!(
            "{}: {} keypoints, {} matches",
            path.display(),
            frame.keypoints().len(),
            frame.matches.len()
        );

        if let Some(dir) = &opt.output_dir {
            write_visualizations(&tracker, dir, path)?;
        }
    }

    Ok(())
}

fn write_visualizations(tracker: &Tracker, dir: &Path, input: &Path) -> Result<(), Error> {
    let history = tracker.history();
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("frame{}", tracker.frames_seen()));

    if let Some(current) = history.newest() {
        visualize::draw_keypoints(current).save(dir.join(format!("{stem}_keypoints.png")))?;

        // the previous frame is gone when the history only holds one frame
        if let Some(previous) = history.len().checked_sub(2).and_then(|i| history.get(i)) {
            visualize::draw_matches(previous, current)
                .save(dir.join(format!("{stem}_matches.png")))?;
        }
    }
    Ok(())
}
