mod io_tests;

use std::path::Path;

use crate::config::RawConfig;
use crate::detection::RawDetection;
use crate::ontology::OntologySource;

pub(crate) fn fixtures() -> anyhow::Result<(OntologySource, Vec<RawDetection>, RawConfig)> {
    Ok((
        crate::io::load_ontology(Path::new("../test_resources/ontology.yml"))?,
        crate::io::load_detections(Path::new("../test_resources/detections.json"))?,
        crate::io::load_config(Path::new("../test_resources/config.yml"))?,
    ))
}
