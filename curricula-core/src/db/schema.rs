pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS programs (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    total_weeks INTEGER NOT NULL DEFAULT 1,
    description TEXT,
    archived_at TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS templates (
    id TEXT PRIMARY KEY,
    week_number INTEGER NOT NULL,
    label TEXT NOT NULL,
    notes TEXT,
    sort_order INTEGER,
    status TEXT NOT NULL DEFAULT 'draft' CHECK (status IN ('draft', 'published', 'deprecated', 'archived')),
    external_link TEXT,
    category TEXT,
    estimated_minutes INTEGER,
    deleted_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

-- Template soft-delete never cascades here; links outlive their template.
CREATE TABLE IF NOT EXISTS program_template_links (
    link_id TEXT PRIMARY KEY,
    program_id TEXT NOT NULL REFERENCES programs(id) ON DELETE CASCADE,
    template_id TEXT NOT NULL REFERENCES templates(id),
    notes TEXT,
    hyperlink TEXT,
    sort_order INTEGER,
    due_offset_days INTEGER,
    required INTEGER,
    visibility TEXT,
    visible INTEGER NOT NULL DEFAULT 1,
    created_by TEXT,
    updated_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE (program_id, template_id)
);

CREATE TABLE IF NOT EXISTS program_managers (
    program_id TEXT NOT NULL REFERENCES programs(id) ON DELETE CASCADE,
    user_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    PRIMARY KEY (program_id, user_id)
);

CREATE TABLE IF NOT EXISTS audit_events (
    id TEXT PRIMARY KEY,
    actor TEXT NOT NULL,
    action TEXT NOT NULL CHECK (action IN ('attach', 'detach', 'update_metadata', 'reorder')),
    program_id TEXT NOT NULL,
    template_id TEXT,
    detail JSON NOT NULL,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_links_program ON program_template_links(program_id);
CREATE INDEX IF NOT EXISTS idx_links_template ON program_template_links(template_id);
CREATE INDEX IF NOT EXISTS idx_templates_status ON templates(status) WHERE deleted_at IS NULL;
CREATE INDEX IF NOT EXISTS idx_audit_program ON audit_events(program_id);
"#;
