use deskflow_skill::SkillCatalog;
use std::fs;

#[test]
fn loads_skills_from_a_directory_tree() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("billing")).unwrap();

    fs::write(
        dir.path().join("refunds.md"),
        "---\nname: refunds\ndescription: Processing refunds\n---\nCheck the order first.\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("billing/invoices.md"),
        "---\nname: invoices\ndescription: Invoice corrections\n---\nVerify the billing period.\n",
    )
    .unwrap();
    // Bad files are skipped, not fatal.
    fs::write(dir.path().join("broken.md"), "no frontmatter at all").unwrap();
    fs::write(dir.path().join("notes.txt"), "not a skill").unwrap();

    let catalog = SkillCatalog::load(dir.path()).unwrap();

    assert_eq!(catalog.len(), 2);
    assert_eq!(catalog.names(), vec!["invoices", "refunds"]);
    assert!(catalog.find("refunds").unwrap().body.contains("Check the order"));
}

#[test]
fn empty_directory_gives_empty_catalog() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = SkillCatalog::load(dir.path()).unwrap();
    assert!(catalog.is_empty());
}
