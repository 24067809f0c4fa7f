// Project tracker schema - project, material, step, category tables for Diesel ORM

diesel::table! {
    project (project_id) {
        project_id -> Integer,
        project_name -> Text,
        estimated_hours -> Nullable<Text>,   // 2-place decimal, e.g. "10.50"
        actual_hours -> Nullable<Text>,
        difficulty -> Nullable<Integer>,
        notes -> Nullable<Text>,
    }
}

diesel::table! {
    material (material_id) {
        material_id -> Integer,
        project_id -> Integer,           // FK to project
        material_name -> Text,
        num_required -> Nullable<Integer>,
        cost -> Nullable<Text>,
    }
}

diesel::table! {
    step (step_id) {
        step_id -> Integer,
        project_id -> Integer,           // FK to project
        step_text -> Text,
        step_order -> Integer,
    }
}

diesel::table! {
    category (category_id) {
        category_id -> Integer,
        category_name -> Text,
    }
}

// ============================================================================
// Join table - projects and categories are many-to-many
// ============================================================================

diesel::table! {
    project_category (project_id, category_id) {
        project_id -> Integer,
        category_id -> Integer,
    }
}

diesel::joinable!(material -> project (project_id));
diesel::joinable!(step -> project (project_id));
diesel::joinable!(project_category -> project (project_id));
diesel::joinable!(project_category -> category (category_id));

diesel::allow_tables_to_appear_in_same_query!(project, material, step, category, project_category,);
