pub mod batchnorm;
pub mod conv;
pub mod dropout;
pub mod flatten;
pub mod linear;
pub mod maxpool;
pub mod relu;
pub mod sequential;
pub mod sequential_builder;

pub use batchnorm::BatchNorm2d;
pub use conv::Conv2d;
pub use dropout::Dropout;
pub use flatten::Flatten;
pub use linear::Linear;
pub use maxpool::MaxPool2d;
pub use relu::ReLU;
pub use sequential::Sequential;
pub use sequential_builder::SequentialBuilder;
