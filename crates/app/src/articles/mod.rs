//! Static article catalog with client-side search and category filtering.

pub mod view;

pub use view::ArticlesView;

/// Article topic, rendered as the filter pills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    MentalHealth,
    Nutrition,
    Fitness,
    ChildHealth,
    Lifestyle,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::MentalHealth,
        Category::Nutrition,
        Category::Lifestyle,
        Category::Fitness,
        Category::ChildHealth,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::MentalHealth => "Kesehatan Mental",
            Category::Nutrition => "Nutrisi",
            Category::Fitness => "Kebugaran",
            Category::ChildHealth => "Kesehatan Anak",
            Category::Lifestyle => "Gaya Hidup Sehat",
        }
    }
}

/// Category filter selection; `All` matches every article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    pub fn label(self) -> &'static str {
        match self {
            CategoryFilter::All => "Semua",
            CategoryFilter::Only(category) => category.label(),
        }
    }
}

/// One entry in the literal catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Article {
    pub id: u32,
    pub title: &'static str,
    pub excerpt: &'static str,
    pub category: Category,
    pub date: &'static str,
    pub read_time: &'static str,
    pub tags: &'static [&'static str],
}

/// Matches on a case-insensitive substring of title or excerpt, combined
/// with the category pill.
pub fn filter_catalog(query: &str, category: CategoryFilter) -> Vec<&'static Article> {
    let normalized = query.trim().to_lowercase();

    CATALOG
        .iter()
        .filter(|article| {
            let matches_search = normalized.is_empty()
                || article.title.to_lowercase().contains(&normalized)
                || article.excerpt.to_lowercase().contains(&normalized);

            let matches_category = match category {
                CategoryFilter::All => true,
                CategoryFilter::Only(wanted) => article.category == wanted,
            };

            matches_search && matches_category
        })
        .collect()
}

pub const CATALOG: &[Article] = &[
    Article {
        id: 1,
        title: "Cara Mengelola Stres: Tips dan Teknik untuk Kesehatan Mental yang Lebih Baik",
        excerpt: "Stres adalah bagian dari kehidupan, namun tidak semua orang tahu cara mengelolanya dengan benar. Artikel ini membahas berbagai teknik efektif untuk mengelola stres sehari-hari, dari meditasi hingga olahraga.",
        category: Category::MentalHealth,
        date: "2024-01-05",
        read_time: "5 min read",
        tags: &["stress", "mental health", "wellness"],
    },
    Article {
        id: 2,
        title: "Pentingnya Pola Makan Sehat untuk Sistem Imun",
        excerpt: "Sistem imun yang kuat adalah kunci untuk menjaga kesehatan tubuh. Pelajari bagaimana pola makan yang tepat dapat meningkatkan sistem kekebalan tubuh Anda.",
        category: Category::Nutrition,
        date: "2024-01-03",
        read_time: "4 min read",
        tags: &["nutrition", "immune system", "health"],
    },
    Article {
        id: 3,
        title: "Olahraga yang Tepat untuk Pemula",
        excerpt: "Ingin memulai gaya hidup aktif tapi bingung harus mulai dari mana? Artikel ini akan membantu Anda memilih jenis olahraga yang tepat untuk pemula.",
        category: Category::Fitness,
        date: "2024-01-01",
        read_time: "6 min read",
        tags: &["fitness", "exercise", "beginner"],
    },
    Article {
        id: 4,
        title: "Pentingnya Kesehatan Mental pada Anak",
        excerpt: "Kesehatan mental anak sama pentingnya dengan kesehatan fisik. Pelajari cara mendukung perkembangan mental anak yang sehat.",
        category: Category::ChildHealth,
        date: "2023-12-28",
        read_time: "7 min read",
        tags: &["children", "mental health", "parenting"],
    },
    Article {
        id: 5,
        title: "Gaya Hidup Sehat di Era Digital",
        excerpt: "Bagaimana menjaga kesehatan di tengah gaya hidup digital? Temukan tips praktis untuk tetap sehat sambil menggunakan teknologi.",
        category: Category::Lifestyle,
        date: "2023-12-25",
        read_time: "5 min read",
        tags: &["lifestyle", "digital health", "wellness"],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_and_all_filter_return_the_full_catalog() {
        assert_eq!(filter_catalog("", CategoryFilter::All).len(), CATALOG.len());
        assert_eq!(
            filter_catalog("   ", CategoryFilter::All).len(),
            CATALOG.len()
        );
    }

    #[test]
    fn search_is_case_insensitive_over_title_and_excerpt() {
        let by_title = filter_catalog("STRES", CategoryFilter::All);
        assert!(by_title.iter().any(|article| article.id == 1));

        // "kekebalan" appears only in article 2's excerpt.
        let by_excerpt = filter_catalog("kekebalan", CategoryFilter::All);
        assert_eq!(by_excerpt.len(), 1);
        assert_eq!(by_excerpt[0].id, 2);
    }

    #[test]
    fn category_pill_narrows_the_list() {
        let mental = filter_catalog("", CategoryFilter::Only(Category::MentalHealth));
        assert_eq!(mental.len(), 1);
        assert_eq!(mental[0].id, 1);
    }

    #[test]
    fn search_and_category_combine() {
        let none = filter_catalog("stres", CategoryFilter::Only(Category::Nutrition));
        assert!(none.is_empty());

        let one = filter_catalog("stres", CategoryFilter::Only(Category::MentalHealth));
        assert_eq!(one.len(), 1);
    }
}
