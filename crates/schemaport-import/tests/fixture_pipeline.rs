use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use schemaport_compile::compile_file;
use schemaport_core::{DEFAULT_SRID, Result};
use schemaport_ddl::ImportPlan;
use schemaport_import::{
    FileListSource, ImportTarget, InsertStatement, RecordBatcher, dataset_files, run_import,
};

#[derive(Default)]
struct Journal {
    scripts: Vec<String>,
    statements: Vec<InsertStatement>,
    committed: bool,
}

struct RecordingTarget {
    journal: Arc<Mutex<Journal>>,
}

#[async_trait]
impl ImportTarget for RecordingTarget {
    async fn execute_script(&mut self, script: &str) -> Result<()> {
        self.journal.lock().unwrap().scripts.push(script.to_string());
        Ok(())
    }

    async fn insert(&mut self, statement: &InsertStatement) -> Result<u64> {
        self.journal.lock().unwrap().statements.push(statement.clone());
        Ok(statement.rows as u64)
    }

    async fn commit(self) -> Result<()> {
        self.journal.lock().unwrap().committed = true;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

fn fixture_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../fixtures/parks")
}

#[tokio::test]
async fn compiles_plans_and_imports_fixture_dataset() {
    let dir = fixture_dir();
    let compiled = compile_file(&dir.join("parks.dataset.schema.json"))
        .await
        .expect("compile fixture");
    assert_eq!(compiled.document["title"], "City parks");

    let plan = ImportPlan::build(&compiled.dataset, DEFAULT_SRID).expect("plan fixture");
    assert_eq!(
        plan.script,
        "DROP SCHEMA IF EXISTS parks CASCADE;\n\
         CREATE SCHEMA parks;\n\
         CREATE TABLE parks.park (id text PRIMARY KEY, dataset text, class text, name text, \
         area_ha double precision, geometry geometry);\n\
         CREATE TABLE parks.tree (id text PRIMARY KEY, dataset text, class text, \
         park text REFERENCES parks.park(id), species text, plant_year integer, geometry geometry);\n\
         GRANT SELECT(species) ON parks.tree TO PUBLIC;"
    );

    let files = dataset_files(&dir).await.expect("list fixture files");
    assert_eq!(files.len(), 2);

    let journal = Arc::new(Mutex::new(Journal::default()));
    let target = RecordingTarget {
        journal: Arc::clone(&journal),
    };
    let mut batcher = RecordBatcher::with_batch_size(FileListSource::new(files), 2);
    let summary = run_import(&plan, target, &mut batcher).await.expect("import fixture");

    assert_eq!(summary.batches, 3);
    assert_eq!(summary.rows_by_table["parks.park"], 2);
    assert_eq!(summary.rows_by_table["parks.tree"], 4);

    let journal = journal.lock().unwrap();
    assert!(journal.committed);
    assert_eq!(journal.scripts, vec![plan.script.clone()]);

    let tables: Vec<&str> = journal
        .statements
        .iter()
        .map(|statement| statement.table.as_str())
        .collect();
    assert_eq!(tables, vec!["parks.park", "parks.tree", "parks.tree"]);

    // Park geometry uses the dataset CRS, tree geometry the class CRS.
    assert!(journal.statements[0].sql.contains("ST_GeomFromGeoJSON($6), 28992)"));
    assert!(journal.statements[1].sql.contains("ST_GeomFromGeoJSON($7), 4326)"));
}
