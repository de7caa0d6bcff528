//! Pane width arithmetic for the docked three-pane row.
//!
//! Everything here is pure: inputs are the available width, which panes
//! are wanted, seed widths and the one-shot force-minimum flags; the
//! output always sums exactly to the available width.

use crate::model::PaneWidths;
use crate::util::clamp;

pub const MIN_LIST: f64 = 320.0;
pub const MIN_DETAILS: f64 = 420.0;
pub const MIN_HELPER: f64 = 320.0;
pub const DEFAULT_SPLITTER_WIDTH: f64 = 12.0;

#[derive(Debug, Clone, Default)]
pub struct SizingInput {
    /// Container width minus the visible splitters.
    pub total: f64,
    pub want_list: bool,
    pub want_helper: bool,
    /// Jump-to-document pins: give the pane exactly its minimum this pass.
    pub force_min_list: bool,
    pub force_min_helper: bool,
    /// Remembered session widths, else current measured widths.
    pub seed_list: Option<f64>,
    pub seed_details: Option<f64>,
    pub seed_helper: Option<f64>,
}

/// Shrinks two minimums to fit, proportionally, keeping the first whole-pixel.
pub fn relax_mins_two(total: f64, a: f64, b: f64) -> (f64, f64) {
    if total <= 0.0 {
        return (0.0, 0.0);
    }
    if a + b <= total {
        return (a, b);
    }
    let scale = total / (a + b);
    let aa = (a * scale).floor().max(0.0);
    let bb = (total - aa).max(0.0);
    (aa, bb)
}

/// Shrinks three minimums to fit. The details pane keeps its minimum the
/// longest: the list gives way first, then the helper.
pub fn relax_mins_three(total: f64, a: f64, b: f64, c: f64) -> (f64, f64, f64) {
    if total <= 0.0 {
        return (0.0, 0.0, 0.0);
    }
    if a + b + c <= total {
        return (a, b, c);
    }
    let mut overflow = a + b + c - total;
    let mut aa = a;
    let mut bb = b;
    let mut cc = c;

    let reduce_a = overflow.min(aa);
    aa -= reduce_a;
    overflow -= reduce_a;

    let reduce_c = overflow.min(cc);
    cc -= reduce_c;
    overflow -= reduce_c;

    let reduce_b = overflow.min(bb);
    bb -= reduce_b;

    (aa.max(0.0), bb.max(0.0), cc.max(0.0))
}

fn scale_to_total(values: &mut [f64], total: f64) {
    let sum: f64 = values.iter().sum();
    if sum == 0.0 || (sum - total).abs() < 2.0 {
        return;
    }
    let factor = total / sum;
    for v in values.iter_mut() {
        *v *= factor;
    }
}

/// Computes the pane widths for one sizing pass. Unwanted panes come out
/// zero; wanted panes respect their (relaxed) minimums except on the
/// force-minimum path, where the details pane takes whatever remains.
pub fn compute_widths(input: &SizingInput) -> PaneWidths {
    let total = input.total;
    if total <= 0.0 {
        return PaneWidths { list: 0.0, details: 0.0, helper: 0.0 };
    }

    let mut min_list = if input.want_list { MIN_LIST } else { 0.0 };
    let mut min_details = MIN_DETAILS;
    let mut min_helper = if input.want_helper { MIN_HELPER } else { 0.0 };

    match (input.want_list, input.want_helper) {
        (true, true) => {
            (min_list, min_details, min_helper) =
                relax_mins_three(total, min_list, min_details, min_helper);
        }
        (false, true) => {
            (min_details, min_helper) = relax_mins_two(total, min_details, min_helper);
        }
        (true, false) => {
            (min_list, min_details) = relax_mins_two(total, min_list, min_details);
            min_helper = 0.0;
        }
        (false, false) => {
            min_list = 0.0;
            min_helper = 0.0;
        }
    }

    let pin_list = input.force_min_list && input.want_list;
    let pin_helper = input.force_min_helper && input.want_helper;

    if pin_list || pin_helper {
        let mut target_list = if pin_list {
            MIN_LIST
        } else {
            input.seed_list.unwrap_or(MIN_LIST)
        };
        let mut target_helper = if pin_helper {
            MIN_HELPER
        } else {
            input.seed_helper.unwrap_or(MIN_HELPER)
        };
        if !input.want_list {
            target_list = 0.0;
        }
        if !input.want_helper {
            target_helper = 0.0;
        }

        let mut list = clamp(target_list, 0.0, total);
        let mut helper = clamp(target_helper, 0.0, total);
        let mut details = total - list - helper;

        // Give the judgment the room back, shrinking list then helper.
        if details < min_details {
            let mut deficit = min_details - details;
            let reduce_list = deficit.min(list);
            list -= reduce_list;
            deficit -= reduce_list;
            if deficit > 0.0 {
                let reduce_helper = deficit.min(helper);
                helper -= reduce_helper;
            }
            details = total - list - helper;
        }

        return PaneWidths {
            list: if input.want_list { list } else { 0.0 },
            details: clamp(details, 0.0, total),
            helper: if input.want_helper { helper } else { 0.0 },
        };
    }

    match (input.want_list, input.want_helper) {
        (true, true) => {
            let mut list = input
                .seed_list
                .unwrap_or_else(|| (total * 0.38).round());
            let mut details = input
                .seed_details
                .unwrap_or_else(|| (total * 0.42).round());
            let mut helper = input.seed_helper.unwrap_or(total - list - details);

            let mut values = [list, details, helper];
            scale_to_total(&mut values, total);
            [list, details, helper] = values;

            list = clamp(list, min_list, (total - min_details - min_helper).max(min_list));
            details = clamp(details, min_details, (total - list - min_helper).max(min_details));
            helper = total - list - details;
            helper = clamp(helper, min_helper, (total - list - details).max(min_helper));

            PaneWidths { list, details, helper }
        }
        (false, true) => {
            let seed_details = input
                .seed_details
                .unwrap_or_else(|| (total * 0.58).round());
            let seed_helper = input.seed_helper.unwrap_or(total - seed_details);

            let mut values = [seed_details, seed_helper];
            scale_to_total(&mut values, total);

            let details = clamp(values[0], min_details, (total - min_helper).max(min_details));
            let helper = clamp(total - details, min_helper, (total - details).max(min_helper));
            PaneWidths { list: 0.0, details: total - helper, helper }
        }
        (true, false) => {
            let seed_list = input
                .seed_list
                .unwrap_or_else(|| (total * 0.45).round());
            let seed_details = input.seed_details.unwrap_or(total - seed_list);

            let mut values = [seed_list, seed_details];
            scale_to_total(&mut values, total);

            let list = clamp(values[0], min_list, (total - min_details).max(min_list));
            let details = clamp(total - list, min_details, (total - list).max(min_details));
            PaneWidths { list: total - details, details, helper: 0.0 }
        }
        (false, false) => PaneWidths { list: 0.0, details: total, helper: 0.0 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_sums_to(widths: &PaneWidths, total: f64) {
        assert!(
            (widths.total() - total).abs() < 0.001,
            "widths {widths:?} should sum to {total}"
        );
    }

    #[test]
    fn default_three_pane_split_fills_total_exactly() {
        let input = SizingInput {
            total: 1176.0, // 1200px container minus two 12px splitters
            want_list: true,
            want_helper: true,
            ..SizingInput::default()
        };
        let w = compute_widths(&input);
        assert_sums_to(&w, 1176.0);
        assert!(w.list >= 320.0 && w.details >= 420.0 && w.helper >= 320.0);
    }

    #[test]
    fn wide_container_keeps_default_proportions() {
        let input = SizingInput {
            total: 2000.0,
            want_list: true,
            want_helper: true,
            ..SizingInput::default()
        };
        let w = compute_widths(&input);
        assert_sums_to(&w, 2000.0);
        assert_eq!(w.list, 760.0); // 38 %
        assert_eq!(w.details, 840.0); // 42 %
        assert_eq!(w.helper, 400.0); // remainder
    }

    #[test]
    fn two_pane_splits_without_list_or_helper() {
        let no_list = compute_widths(&SizingInput {
            total: 1000.0,
            want_list: false,
            want_helper: true,
            ..SizingInput::default()
        });
        assert_sums_to(&no_list, 1000.0);
        assert_eq!(no_list.list, 0.0);
        assert_eq!(no_list.details, 580.0); // 58 %

        let no_helper = compute_widths(&SizingInput {
            total: 1000.0,
            want_list: true,
            want_helper: false,
            ..SizingInput::default()
        });
        assert_sums_to(&no_helper, 1000.0);
        assert_eq!(no_helper.helper, 0.0);
        assert_eq!(no_helper.list, 450.0); // 45 %

        let only_details = compute_widths(&SizingInput {
            total: 1000.0,
            want_list: false,
            want_helper: false,
            ..SizingInput::default()
        });
        assert_eq!(only_details.details, 1000.0);
    }

    #[test]
    fn remembered_widths_rescale_to_the_new_total() {
        let input = SizingInput {
            total: 2000.0,
            want_list: true,
            want_helper: true,
            seed_list: Some(500.0),
            seed_details: Some(300.0),
            seed_helper: Some(200.0),
            ..SizingInput::default()
        };
        let w = compute_widths(&input);
        assert_sums_to(&w, 2000.0);
        // 500/300/200 scaled by 2 gives 1000/600/400; list and helper keep
        // it, details already clears its minimum.
        assert_eq!(w.list, 1000.0);
        assert_eq!(w.details, 600.0);
        assert_eq!(w.helper, 400.0);
    }

    #[test]
    fn narrow_container_relaxes_list_first_then_helper() {
        let (list, details, helper) = relax_mins_three(500.0, 320.0, 420.0, 320.0);
        assert_eq!(list, 0.0);
        assert_eq!(details, 420.0);
        assert_eq!(helper, 80.0);
        assert_eq!(list + details + helper, 500.0);

        // Details only gives way once list and helper are exhausted.
        let (list, details, helper) = relax_mins_three(300.0, 320.0, 420.0, 320.0);
        assert_eq!((list, helper), (0.0, 0.0));
        assert_eq!(details, 300.0);
    }

    #[test]
    fn relax_two_keeps_whole_pixels_and_exact_sum() {
        let (a, b) = relax_mins_two(500.0, 420.0, 320.0);
        assert_eq!(a + b, 500.0);
        assert_eq!(a, a.floor());
        assert!(a < 420.0 && b < 320.0);

        assert_eq!(relax_mins_two(1000.0, 420.0, 320.0), (420.0, 320.0));
        assert_eq!(relax_mins_two(0.0, 420.0, 320.0), (0.0, 0.0));
    }

    #[test]
    fn force_min_pins_panes_and_gives_details_the_rest() {
        let input = SizingInput {
            total: 2000.0,
            want_list: true,
            want_helper: true,
            force_min_list: true,
            force_min_helper: true,
            seed_list: Some(800.0),
            seed_details: Some(700.0),
            seed_helper: Some(500.0),
            ..SizingInput::default()
        };
        let w = compute_widths(&input);
        assert_eq!(w.list, 320.0);
        assert_eq!(w.helper, 320.0);
        assert_eq!(w.details, 1360.0);
        assert_sums_to(&w, 2000.0);
    }

    #[test]
    fn force_min_lets_details_dip_below_nominal_minimum_only_here() {
        // 320 + 320 pinned leaves 60 for details; the deficit path claws
        // back from list then helper until details reaches its relaxed min.
        let input = SizingInput {
            total: 700.0,
            want_list: true,
            want_helper: true,
            force_min_list: true,
            force_min_helper: true,
            ..SizingInput::default()
        };
        let w = compute_widths(&input);
        assert_sums_to(&w, 700.0);
        assert!(w.details >= 420.0 - 0.001);
        assert_eq!(w.list, 0.0);
    }

    #[test]
    fn force_min_helper_alone_keeps_list_seed() {
        let input = SizingInput {
            total: 2000.0,
            want_list: true,
            want_helper: true,
            force_min_helper: true,
            seed_list: Some(600.0),
            ..SizingInput::default()
        };
        let w = compute_widths(&input);
        assert_eq!(w.list, 600.0);
        assert_eq!(w.helper, 320.0);
        assert_eq!(w.details, 1080.0);
    }

    #[test]
    fn zero_total_yields_all_zero() {
        let w = compute_widths(&SizingInput {
            total: 0.0,
            want_list: true,
            want_helper: true,
            ..SizingInput::default()
        });
        assert_eq!((w.list, w.details, w.helper), (0.0, 0.0, 0.0));
    }
}
