pub mod features;
pub mod encoder;
pub mod aligner;
pub mod predictor;
pub mod inference;
pub mod estimator;

pub use features::{NumericFeatures, TemporalFeatures};
pub use encoder::{CategoricalEncoder, EncodedCategories};
pub use aligner::{align, FeatureRow};
pub use predictor::{LinearPredictor, Predictor, PredictorError, RegressionTree, TreeEnsemblePredictor, TreeNode};
pub use inference::{InferenceFacade, PredictionSet, PriceComparison};
pub use estimator::{FareEstimate, FareEstimator, FeatureDraft, FeatureInspection, PredictorInput};
