#![allow(dead_code)]

use ingest_config::config::{ConfigDocument, ConfigValue};
use ingest_config::sources::Source;

/// Builder for `ConfigDocument` to simplify test setup.
pub struct ConfigDocumentBuilder {
    doc: ConfigDocument,
}

impl ConfigDocumentBuilder {
    pub fn new() -> Self {
        Self {
            doc: ConfigDocument::new(),
        }
    }

    /// Global `db.*` keys.
    pub fn with_connection(self, host: &str, port: i64, user: &str, password: &str) -> Self {
        self.with("db.host", host)
            .with("db.port", port)
            .with("db.user", user)
            .with("db.password", password)
    }

    pub fn with(mut self, key: &str, value: impl Into<ConfigValue>) -> Self {
        self.doc = self
            .doc
            .with_value(key, value)
            .unwrap_or_else(|err| panic!("test document key {key:?}: {err}"));
        self
    }

    /// Declare `source` with its marker, batch size and one value per path field.
    pub fn with_source(
        mut self,
        source: Source,
        database: &str,
        batch_size: i64,
        paths: &[&str],
    ) -> Self {
        assert_eq!(
            paths.len(),
            source.path_fields().len(),
            "wrong number of paths for {source}"
        );
        self = self
            .with(&source.written_marker_key(), database)
            .with(&source.key("batch_size"), batch_size);
        for (field, path) in source.path_fields().iter().zip(paths) {
            self = self.with(&source.key(field), *path);
        }
        self
    }

    /// A fully resolved document declaring all four sources under `/data`.
    pub fn resolved() -> Self {
        Self::new()
            .with_connection("mysql.internal", 3306, "loader", "s3cret")
            .with("database", "forome")
            .with_source(Source::PharmGkb, "pharmgkb", 100, &["/data/pharmgkb"])
            .with_source(
                Source::Gtex,
                "gtex",
                10000,
                &["/data/gtex/GTEx_Analysis_2017-06-05_v8_RNASeQCv1.1.9_gene_median_tpm.gct.gz"],
            )
            .with_source(
                Source::Clinvar,
                "clinvar",
                1000,
                &["/data/clinvar/variant_summary.txt.gz", "/data/clinvar/ClinVarFullRelease.xml.gz"],
            )
            .with_source(
                Source::Gtf,
                "ensembl",
                10000,
                &["/data/ensembl/Homo_sapiens.GRCh38.105.chr.gtf.gz"],
            )
    }

    pub fn build(self) -> ConfigDocument {
        self.doc
    }
}

impl Default for ConfigDocumentBuilder {
    fn default() -> Self {
        Self::new()
    }
}
