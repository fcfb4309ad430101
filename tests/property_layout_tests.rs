use proptest::prelude::*;
use storyviz::core::{ChartKind, Dataset, FieldValue, Viewport, row};
use storyviz::layout::{LayoutConfig, Margins, compute_margins};

fn kind_strategy() -> impl Strategy<Value = ChartKind> {
    prop_oneof![
        Just(ChartKind::Line),
        Just(ChartKind::Area),
        Just(ChartKind::Bar),
        Just(ChartKind::Scatter),
        Just(ChartKind::Pie),
        Just(ChartKind::Grid),
    ]
}

fn dataset(values: &[(f64, f64, u8)]) -> Dataset {
    Dataset::new(
        values
            .iter()
            .map(|(x, y, series)| {
                row([
                    ("year", FieldValue::Number(*x)),
                    ("value", FieldValue::Number(*y)),
                    ("series", FieldValue::Text(format!("series-{series}"))),
                ])
            })
            .collect(),
    )
}

proptest! {
    #[test]
    fn margins_and_inner_area_respect_floors(
        kind in kind_strategy(),
        values in prop::collection::vec(
            (1900.0f64..2100.0, -1.0e7f64..1.0e7, 0u8..6),
            0..24,
        ),
        title_len in 0usize..60,
        legend in any::<bool>(),
        width in 1u32..2400,
        height in 1u32..1600,
        floor in 0.0f64..80.0,
        min_inner in 0.0f64..300.0,
    ) {
        let mut config = LayoutConfig::new(kind)
            .with_legend(legend)
            .with_min_margins(Margins::new(floor, floor, floor, floor))
            .with_min_inner_size(min_inner, min_inner);
        if title_len > 0 {
            config = config.with_title("t".repeat(title_len));
        }
        let data = dataset(&values);
        let metrics = compute_margins(&data, &config, Viewport::new(width, height));

        for side in [metrics.top, metrics.right, metrics.bottom, metrics.left] {
            prop_assert!(side.is_finite());
            prop_assert!(side >= floor);
        }
        prop_assert!(metrics.inner_width >= min_inner);
        prop_assert!(metrics.inner_height >= min_inner);

        let again = compute_margins(&data, &config, Viewport::new(width, height));
        prop_assert_eq!(metrics, again);
    }

    #[test]
    fn longer_titles_never_shrink_the_top_margin(
        short in 0usize..40,
        extra in 0usize..40,
    ) {
        let data = Dataset::default();
        let screen = Viewport::new(1280, 720);
        let short_config = LayoutConfig::new(ChartKind::Line).with_title("a".repeat(short));
        let long_config = LayoutConfig::new(ChartKind::Line).with_title("a".repeat(short + extra));

        let short_top = compute_margins(&data, &short_config, screen).top;
        let long_top = compute_margins(&data, &long_config, screen).top;
        prop_assert!(long_top >= short_top);
    }
}
