mod books;

pub use books::BookRepository;
