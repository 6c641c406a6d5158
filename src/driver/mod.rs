use rand::Rng;
use crate::storage::manager::{PagingManager, SENTINEL};

/// Indices written with the fixed value before the sweep. The last one lies
/// past the end of the default 10000-element array.
pub const SCRIPTED_WRITES: [usize; 5] = [522, 523, 555, 530, 10500];
pub const SCRIPTED_VALUE: i32 = 120;
/// Elements swept by read, write, read-again: four full pages.
pub const SWEEP_LEN: usize = 512;

#[derive(Debug, Default)]
pub struct DemoReport {
    pub preloaded: Vec<u32>,
    pub write_failures: Vec<usize>,
    pub read_failures: Vec<usize>,
    /// (index, value before, value after) for each swept element.
    pub sweep: Vec<(usize, i32, i32)>,
}

/// Exercise the manager with the scripted access sequence.
pub fn run_demo<R: Rng>(manager: &mut PagingManager, rng: &mut R) -> DemoReport {
    let mut report = DemoReport::default();

    if manager.page_count() > 0 {
        for _ in 0..manager.frame_limit() {
            let page = rng.random_range(0..manager.page_count());
            if manager.is_resident(page) {
                continue;
            }
            if manager.preload(page).is_ok() {
                report.preloaded.push(page);
            }
        }
    }

    for index in SCRIPTED_WRITES {
        if manager.write_element(index, SCRIPTED_VALUE) == SENTINEL {
            report.write_failures.push(index);
        }
    }

    for index in 0..SWEEP_LEN {
        let value = rng.random_range(2..1000);

        let before = manager.read_element(index);
        if before == SENTINEL {
            report.read_failures.push(index);
        }
        if manager.write_element(index, value) == SENTINEL {
            report.write_failures.push(index);
        }
        let after = manager.read_element(index);
        if after == SENTINEL {
            report.read_failures.push(index);
        }

        report.sweep.push((index, before, after));
    }

    report
}
