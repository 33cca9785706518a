use indoc::indoc;

/// Small store schema: `invoice_line` sorts before `track` but references it
pub const STORE_SCHEMA: &str = indoc! {r#"
    CREATE TABLE customer (
        customer_id INTEGER PRIMARY KEY,
        first_name VARCHAR(40) NOT NULL,
        company VARCHAR(80),
        avatar BYTEA
    );

    CREATE TABLE track (
        track_id INTEGER PRIMARY KEY,
        name VARCHAR(200) NOT NULL,
        unit_price NUMERIC(10, 2) NOT NULL
    );

    CREATE TABLE invoice (
        invoice_id INTEGER PRIMARY KEY,
        customer_id INTEGER NOT NULL REFERENCES customer(customer_id),
        total NUMERIC(10, 2) NOT NULL
    );

    CREATE TABLE invoice_line (
        invoice_id INTEGER NOT NULL REFERENCES invoice(invoice_id),
        track_id INTEGER NOT NULL REFERENCES track(track_id),
        quantity INTEGER NOT NULL,
        PRIMARY KEY (invoice_id, track_id)
    );

    CREATE INDEX idx_invoice_customer ON invoice (customer_id);
    CREATE INDEX idx_invoice_line_track ON invoice_line (track_id);
"#};

pub const STORE_DATA: &str = indoc! {r#"
    INSERT INTO customer VALUES (1, 'Siobhán', 'O''Reilly & Sons', '\x00ff0a');
    INSERT INTO customer VALUES (2, 'Ana', NULL, NULL);
    INSERT INTO track VALUES (10, 'Don''t Stop', 0.99);
    INSERT INTO invoice VALUES (100, 1, 1.98);
    INSERT INTO invoice_line VALUES (100, 10, 2);
"#};

/// Employees that report to each other
pub const SELF_REFERENCE_SCHEMA: &str = indoc! {r#"
    CREATE TABLE employee (
        employee_id INTEGER PRIMARY KEY,
        reports_to INTEGER REFERENCES employee(employee_id)
    );
    INSERT INTO employee VALUES (1, NULL), (2, 1);
"#};

/// Two tables referencing each other
pub const CYCLE_SCHEMA: &str = indoc! {r#"
    CREATE TABLE department (
        department_id INTEGER PRIMARY KEY,
        manager_id INTEGER
    );
    CREATE TABLE manager (
        manager_id INTEGER PRIMARY KEY,
        department_id INTEGER REFERENCES department(department_id)
    );
    ALTER TABLE department
        ADD CONSTRAINT department_manager_fk FOREIGN KEY (manager_id) REFERENCES manager(manager_id);
"#};

/// No binary columns, `0x` literals are not bytea input syntax.
/// `album` sorts before `artist` but references it.
pub const RESTORABLE_SCHEMA: &str = indoc! {r#"
    CREATE TABLE artist (
        artist_id INTEGER PRIMARY KEY,
        name VARCHAR(120)
    );
    CREATE TABLE album (
        album_id INTEGER PRIMARY KEY,
        artist_id INTEGER NOT NULL REFERENCES artist(artist_id),
        title VARCHAR(160) NOT NULL,
        released DATE,
        catalog_uuid UUID,
        details JSONB
    );
    CREATE INDEX idx_album_artist ON album (artist_id);
    INSERT INTO artist VALUES (1, 'AC/DC'), (2, NULL);
    INSERT INTO album VALUES
        (1, 1, 'For Those About To Rock', '1981-11-23', 'a0eebc99-9c0b-4ef8-bb6d-6bb9bd380a11', '{"tracks": 10}'),
        (2, 1, 'Let''s Rock', NULL, NULL, NULL);
"#};

/// Table names that only survive a replay when quoted
pub const QUOTED_NAMES_SCHEMA: &str = indoc! {r#"
    CREATE TABLE "Customer" (
        "CustomerId" INTEGER PRIMARY KEY,
        name TEXT NOT NULL
    );
    CREATE TABLE "2024_orders" (
        order_id INTEGER PRIMARY KEY,
        "CustomerId" INTEGER NOT NULL REFERENCES "Customer"("CustomerId")
    );
    CREATE INDEX "IFK_OrderCustomer" ON "2024_orders" ("CustomerId");
    INSERT INTO "Customer" VALUES (1, 'Ada');
    INSERT INTO "2024_orders" VALUES (7, 1);
"#};
