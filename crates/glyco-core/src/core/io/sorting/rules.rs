use phf::{Map, phf_map};

#[rustfmt::skip]
pub static ATOM_ORDER_WEIGHTS: Map<&'static str, i32> = phf_map! {
    // --- Skeleton Carbons (100-199) ---
    "C1" => 100, "C2" => 110, "C3" => 120, "C4" => 130, "C5" => 140, "C6" => 150,
    "C7" => 160, "C8" => 170, // N-acetyl carbonyl and methyl

    // --- Oxygens (200-299) ---
    "O1" => 200, "O2" => 210, "O3" => 220, "O4" => 230,
    "O5" => 240, // Ring oxygen
    "O6" => 250,
    "O7" => 260, // N-acetyl carbonyl

    // --- Nitrogen (300-399) ---
    "N2" => 300,

    // --- Carbon-bound Hydrogens (400-499) ---
    "H1" => 400, "H2" => 410, "H3" => 420, "H4" => 430, "H5" => 440,
    "H61" => 450, "H62" => 451,
    "H81" => 470, "H82" => 471, "H83" => 472,

    // --- Heteroatom-bound Hydrogens (500-599) ---
    "H1o" => 500, "H2o" => 510, "H3o" => 520, "H4o" => 530, "H6o" => 550,
    "H2n" => 560,
};

pub static ATOM_NAME_ALIASES: Map<&'static str, &'static str> = phf_map! {
    // --- Hydroxyl hydrogens ---
    "HO1" => "H1o", "HO2" => "H2o", "HO3" => "H3o", "HO4" => "H4o", "HO6" => "H6o",
    "H1O" => "H1o", "H2O" => "H2o", "H3O" => "H3o", "H4O" => "H4o", "H6O" => "H6o",

    // --- Exocyclic methylene ---
    "H6A" => "H61", "H6B" => "H62",
    "H6R" => "H61", "H6S" => "H62",

    // --- Ring oxygen ---
    "O" => "O5", "O5R" => "O5",

    // --- N-acetyl ---
    "HN2" => "H2n", "H2N" => "H2n",
};
