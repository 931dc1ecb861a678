pub mod amfi_disclosures;
pub mod moneycontrol;
pub mod pdf_table;
pub mod util;
pub mod valueresearch;

use crate::core::config::AppConfig;
use crate::core::source::SourceChain;
use moneycontrol::MoneyControlSource;
use valueresearch::ValueResearchSource;

/// The HTML sources in priority order.
pub fn source_chain(config: &AppConfig) -> SourceChain {
    SourceChain::new(
        vec![
            Box::new(MoneyControlSource::new(&config.sources.moneycontrol)),
            Box::new(ValueResearchSource::new(&config.sources.valueresearch)),
        ],
        config.throttle.adapter_delay(),
    )
}
