use speculate2::speculate;

speculate! {
    use curricula_core::models::*;
    use curricula_core::Database;
    use serde_json::json;
    use uuid::Uuid;

    fn setup_db() -> Database {
        let db = Database::open_memory().expect("Failed to create test database");
        db.migrate().expect("Failed to migrate test database");
        db
    }

    fn create_program(db: &Database, title: &str) -> Program {
        db.create_program(CreateProgramInput {
            title: title.into(),
            total_weeks: 4,
            description: None,
        })
        .expect("Failed to create program")
    }

    fn create_template(db: &Database, week: i64, label: &str, status: TemplateStatus) -> Template {
        let mut input = CreateTemplateInput::new(week, label);
        input.status = Some(status);
        db.create_template(input).expect("Failed to create template")
    }

    fn published(db: &Database, week: i64, label: &str) -> Template {
        create_template(db, week, label, TemplateStatus::Published)
    }

    fn patch(body: serde_json::Value) -> MetadataPatch {
        match body {
            serde_json::Value::Object(map) => MetadataPatch::sanitize(&map).expect("valid patch"),
            _ => panic!("patch body must be an object"),
        }
    }

    fn attach(db: &Database, program: &Program, template: &Template) -> AttachOutcome {
        db.attach_template(program.id, template.id, &MetadataPatch::default(), None)
            .expect("Failed to attach")
    }

    describe "attach" {
        it "is idempotent and reports alreadyAttached on the second call" {
            let db = setup_db();
            let program = create_program(&db, "Backend");
            let template = published(&db, 1, "Laptop setup");

            let first = attach(&db, &program, &template);
            let second = attach(&db, &program, &template);

            assert!(!first.already_attached);
            assert!(second.already_attached);
            assert_eq!(first.template.link_id, second.template.link_id);

            let panel = db.list_program_templates(program.id, &ListTemplatesQuery::default()).unwrap();
            assert_eq!(panel.assigned.len(), 1);
        }

        it "fails with program_not_found for an unknown program" {
            let db = setup_db();
            let template = published(&db, 1, "Laptop setup");

            let err = db
                .attach_template(Uuid::new_v4(), template.id, &MetadataPatch::default(), None)
                .unwrap_err();
            assert_eq!(err.code(), "program_not_found");
        }

        it "fails with template_not_found for soft-deleted templates" {
            let db = setup_db();
            let program = create_program(&db, "Backend");
            let template = published(&db, 1, "Laptop setup");
            db.soft_delete_template(template.id).unwrap();

            let err = db
                .attach_template(program.id, template.id, &MetadataPatch::default(), None)
                .unwrap_err();
            assert_eq!(err.code(), "template_not_found");
        }

        it "refuses new links to draft templates" {
            let db = setup_db();
            let program = create_program(&db, "Backend");
            let template = create_template(&db, 1, "Secret draft", TemplateStatus::Draft);

            let err = db
                .attach_template(program.id, template.id, &MetadataPatch::default(), None)
                .unwrap_err();
            assert_eq!(err.code(), "invalid_status");
        }

        it "grandfathers links whose template is no longer published" {
            let db = setup_db();
            let program = create_program(&db, "Backend");
            let template = published(&db, 1, "Old checklist");
            attach(&db, &program, &template);
            db.set_template_status(template.id, "deprecated").unwrap();

            let again = attach(&db, &program, &template);
            assert!(again.already_attached);
            assert_eq!(again.template.status, TemplateStatus::Deprecated);
        }

        it "stores attach-time overrides" {
            let db = setup_db();
            let program = create_program(&db, "Backend");
            let template = published(&db, 1, "Laptop setup");

            let outcome = db
                .attach_template(program.id, template.id, &patch(json!({"notes": "bring charger", "sort_order": "5"})), None)
                .unwrap();
            assert_eq!(outcome.template.notes.as_deref(), Some("bring charger"));
            assert_eq!(outcome.template.sort_order, Some(5));
        }
    }

    describe "detach" {
        it "reports wasAttached=false when no link exists" {
            let db = setup_db();
            let program = create_program(&db, "Backend");
            let template = published(&db, 1, "Laptop setup");

            let outcome = db.detach_template(program.id, template.id).unwrap();
            assert!(!outcome.was_attached);
        }

        it "removes the link once and stays quiet afterwards" {
            let db = setup_db();
            let program = create_program(&db, "Backend");
            let template = published(&db, 1, "Laptop setup");
            attach(&db, &program, &template);

            assert!(db.detach_template(program.id, template.id).unwrap().was_attached);
            assert!(!db.detach_template(program.id, template.id).unwrap().was_attached);
        }

        it "still works for soft-deleted templates" {
            let db = setup_db();
            let program = create_program(&db, "Backend");
            let template = published(&db, 1, "Laptop setup");
            attach(&db, &program, &template);
            db.soft_delete_template(template.id).unwrap();

            let outcome = db.detach_template(program.id, template.id).unwrap();
            assert!(outcome.was_attached);
            assert!(outcome.template.is_deleted());
        }

        it "fails with template_not_found only for templates that never existed" {
            let db = setup_db();
            let program = create_program(&db, "Backend");

            let err = db.detach_template(program.id, Uuid::new_v4()).unwrap_err();
            assert_eq!(err.code(), "template_not_found");
        }
    }

    describe "metadata" {
        it "resolves each field as override, then template default" {
            let db = setup_db();
            let program = create_program(&db, "Backend");
            let mut input = CreateTemplateInput::new(1, "Read handbook");
            input.status = Some(TemplateStatus::Published);
            input.notes = Some("A".into());
            input.external_link = Some("https://handbook".into());
            let template = db.create_template(input).unwrap();

            let attached = attach(&db, &program, &template);
            assert_eq!(attached.template.notes.as_deref(), Some("A"));

            let set = db.update_link_metadata(program.id, template.id, &patch(json!({"notes": "B"})), None).unwrap();
            assert!(set.updated);
            assert_eq!(set.template.notes.as_deref(), Some("B"));
            assert_eq!(set.template.hyperlink.as_deref(), Some("https://handbook"));
            assert_eq!(set.template.overrides, vec!["notes".to_string()]);

            let cleared = db.update_link_metadata(program.id, template.id, &patch(json!({"notes": ""})), None).unwrap();
            assert_eq!(cleared.template.notes.as_deref(), Some("A"));
            assert!(cleared.template.overrides.is_empty());
        }

        it "stamps updated_by" {
            let db = setup_db();
            let program = create_program(&db, "Backend");
            let template = published(&db, 1, "Read handbook");
            attach(&db, &program, &template);
            let editor = Uuid::new_v4();

            let outcome = db
                .update_link_metadata(program.id, template.id, &patch(json!({"visible": false})), Some(editor))
                .unwrap();
            assert_eq!(outcome.template.updated_by, Some(editor));
            assert!(!outcome.template.visible);
        }

        it "rejects empty patches with no_fields" {
            let db = setup_db();
            let program = create_program(&db, "Backend");
            let template = published(&db, 1, "Read handbook");
            attach(&db, &program, &template);

            let err = db
                .update_link_metadata(program.id, template.id, &MetadataPatch::default(), None)
                .unwrap_err();
            assert_eq!(err.code(), "no_fields");
        }

        it "fails with not_found when the template is not linked" {
            let db = setup_db();
            let program = create_program(&db, "Backend");
            let template = published(&db, 1, "Read handbook");

            let err = db
                .update_link_metadata(program.id, template.id, &patch(json!({"notes": "x"})), None)
                .unwrap_err();
            assert_eq!(err.code(), "not_found");
        }
    }

    describe "reorder" {
        it "assigns positions by link id within one program only" {
            let db = setup_db();
            let p1 = create_program(&db, "Backend");
            let p2 = create_program(&db, "Frontend");
            let t1 = published(&db, 1, "One");
            let t2 = published(&db, 1, "Two");
            let t3 = published(&db, 1, "Three");

            let l1 = attach(&db, &p1, &t1).template.link_id;
            let l2 = attach(&db, &p1, &t2).template.link_id;
            let l3 = attach(&db, &p1, &t3).template.link_id;
            let other = db
                .attach_template(p2.id, t1.id, &patch(json!({"sort_order": 9})), None)
                .unwrap()
                .template
                .link_id;

            let updated = db.reorder_links(p1.id, &[l3, l1, l2, other], None).unwrap();
            assert_eq!(updated, 3);

            let order = |template: &Template, program: &Program| {
                db.get_effective_template(program.id, template.id).unwrap().unwrap().sort_order
            };
            assert_eq!(order(&t3, &p1), Some(1));
            assert_eq!(order(&t1, &p1), Some(2));
            assert_eq!(order(&t2, &p1), Some(3));
            assert_eq!(order(&t1, &p2), Some(9));
        }

        it "keeps week numbers when reordering inside a week" {
            let db = setup_db();
            let p1 = create_program(&db, "Backend");
            let t1 = published(&db, 1, "T1");
            let t2 = published(&db, 1, "T2");
            let l1 = attach(&db, &p1, &t1).template.link_id;
            let l2 = attach(&db, &p1, &t2).template.link_id;

            assert_eq!(db.reorder_links(p1.id, &[l2, l1], None).unwrap(), 2);

            let panel = db.list_program_templates(p1.id, &ListTemplatesQuery::default()).unwrap();
            let labels: Vec<_> = panel.assigned.iter().map(|t| (t.label.as_str(), t.week_number)).collect();
            assert_eq!(labels, vec![("T2", 1), ("T1", 1)]);
        }

        it "rejects duplicate ids with invalid_order" {
            let db = setup_db();
            let program = create_program(&db, "Backend");
            let id = Uuid::new_v4();

            let err = db.reorder_links(program.id, &[id, id], None).unwrap_err();
            assert_eq!(err.code(), "invalid_order");
        }
    }

    describe "listing" {
        it "offers only unlinked published templates in the picker" {
            let db = setup_db();
            let program = create_program(&db, "Backend");
            let linked = published(&db, 1, "Linked");
            let open = published(&db, 2, "Open");
            let draft = create_template(&db, 2, "T5", TemplateStatus::Draft);
            attach(&db, &program, &linked);

            let panel = db.list_program_templates(program.id, &ListTemplatesQuery::default()).unwrap();
            let ids: Vec<_> = panel.available.iter().map(|t| t.id).collect();
            assert_eq!(ids, vec![open.id]);

            db.set_template_status(draft.id, "published").unwrap();
            let panel = db.list_program_templates(program.id, &ListTemplatesQuery::default()).unwrap();
            assert!(panel.available.iter().any(|t| t.id == draft.id));
            assert!(!attach(&db, &program, &draft).already_attached);
        }

        it "keeps links to soft-deleted templates, flagged archived" {
            let db = setup_db();
            let program = create_program(&db, "Backend");
            let template = published(&db, 1, "Retired");
            attach(&db, &program, &template);
            db.soft_delete_template(template.id).unwrap();

            let hidden = db.list_program_templates(program.id, &ListTemplatesQuery::default()).unwrap();
            assert!(hidden.assigned.is_empty());

            let query = ListTemplatesQuery { include_deleted: true, status: None };
            let shown = db.list_program_templates(program.id, &query).unwrap();
            assert_eq!(shown.assigned.len(), 1);
            assert!(shown.assigned[0].archived);

            db.restore_template(template.id).unwrap();
            let restored = db.list_program_templates(program.id, &ListTemplatesQuery::default()).unwrap();
            assert!(!restored.assigned[0].archived);
        }

        it "filters assigned templates by status" {
            let db = setup_db();
            let program = create_program(&db, "Backend");
            let keep = published(&db, 1, "Keep");
            let old = published(&db, 1, "Old");
            attach(&db, &program, &keep);
            attach(&db, &program, &old);
            db.set_template_status(old.id, "deprecated").unwrap();

            let query = ListTemplatesQuery { include_deleted: false, status: Some(TemplateStatus::Deprecated) };
            let panel = db.list_program_templates(program.id, &query).unwrap();
            assert_eq!(panel.assigned.len(), 1);
            assert_eq!(panel.assigned[0].template_id, old.id);
        }
    }

    describe "template lifecycle" {
        it "rejects unknown statuses" {
            let db = setup_db();
            let template = published(&db, 1, "Anything");

            let err = db.set_template_status(template.id, "live").unwrap_err();
            assert_eq!(err.code(), "invalid_status");
        }
    }

    describe "manager scope" {
        it "grants once and reports membership" {
            let db = setup_db();
            let program = create_program(&db, "Backend");
            let user = Uuid::new_v4();

            assert!(!db.is_program_manager(program.id, user).unwrap());
            assert!(db.grant_manager(program.id, user).unwrap());
            assert!(!db.grant_manager(program.id, user).unwrap());
            assert!(db.is_program_manager(program.id, user).unwrap());
        }
    }

    describe "audit" {
        it "round-trips entries per program" {
            let db = setup_db();
            let program = create_program(&db, "Backend");
            let actor = Uuid::new_v4();

            db.insert_audit(&AuditEntry {
                actor,
                action: AuditAction::Reorder,
                program_id: program.id,
                template_id: None,
                detail: json!({"updated": 2}),
            })
            .unwrap();

            let events = db.list_audit(program.id).unwrap();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].entry.action, AuditAction::Reorder);
            assert_eq!(events[0].entry.detail, json!({"updated": 2}));
        }
    }

    describe "persistence" {
        it "survives reopening a file-backed database" {
            let dir = tempfile::tempdir().unwrap();
            let path = dir.path().join("curricula.db");

            let program_id = {
                let db = Database::open(&path).unwrap();
                db.migrate().unwrap();
                create_program(&db, "Backend").id
            };

            let db = Database::open(&path).unwrap();
            db.migrate().unwrap();
            let program = db.get_program(program_id).unwrap().unwrap();
            assert_eq!(program.lifecycle(), ProgramLifecycle::Active);
            assert_eq!(db.archive_program(program_id).unwrap().lifecycle(), ProgramLifecycle::Archived);
        }
    }
}
